//! Wearable device integration (Huawei Health).

pub mod client;
pub mod service;
pub mod vitals;

pub use client::{AuthorizationLink, HuaweiHealthClient, TokenGrant, WearableApi};
pub use service::{ConnectOutcome, RefreshOutcome, WearableReport, WearableService};
pub use vitals::{BloodPressure, VitalAlert, VitalSigns};
