//! Equality filters, one per listable entity. Each converts to the generic
//! backend filter map; field order in the map is stable (BTreeMap), which
//! keeps the query-cache fingerprint deterministic.

use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;

use super::enums::{
    AppointmentStatus, BudgetStatus, ExamStatus, PersonStatus, TransactionKind, TransactionStatus,
};
use crate::backend::EqFilter;

#[derive(Debug, Clone, Default)]
pub struct PatientFilter {
    pub status: Option<PersonStatus>,
    pub preferred_doctor: Option<String>,
}

impl PatientFilter {
    pub(crate) fn to_eq(&self) -> EqFilter {
        let mut f = EqFilter::new();
        if let Some(status) = self.status {
            f.insert("status".into(), json!(status.as_str()));
        }
        if let Some(ref doctor) = self.preferred_doctor {
            f.insert("preferred_doctor".into(), json!(doctor));
        }
        f
    }
}

#[derive(Debug, Clone, Default)]
pub struct DoctorFilter {
    pub status: Option<PersonStatus>,
    pub specialty: Option<String>,
}

impl DoctorFilter {
    pub(crate) fn to_eq(&self) -> EqFilter {
        let mut f = EqFilter::new();
        if let Some(status) = self.status {
            f.insert("status".into(), json!(status.as_str()));
        }
        if let Some(ref specialty) = self.specialty {
            f.insert("specialty".into(), json!(specialty));
        }
        f
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
}

impl AppointmentFilter {
    pub(crate) fn to_eq(&self) -> EqFilter {
        let mut f = EqFilter::new();
        if let Some(date) = self.date {
            f.insert("date".into(), json!(date));
        }
        if let Some(status) = self.status {
            f.insert("status".into(), json!(status.as_str()));
        }
        if let Some(patient_id) = self.patient_id {
            f.insert("patient_id".into(), json!(patient_id));
        }
        if let Some(doctor_id) = self.doctor_id {
            f.insert("doctor_id".into(), json!(doctor_id));
        }
        f
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub date: Option<NaiveDate>,
    pub kind: Option<TransactionKind>,
    pub status: Option<TransactionStatus>,
    pub appointment_id: Option<Uuid>,
}

impl TransactionFilter {
    pub(crate) fn to_eq(&self) -> EqFilter {
        let mut f = EqFilter::new();
        if let Some(date) = self.date {
            f.insert("date".into(), json!(date));
        }
        if let Some(kind) = self.kind {
            f.insert("type".into(), json!(kind.as_str()));
        }
        if let Some(status) = self.status {
            f.insert("status".into(), json!(status.as_str()));
        }
        if let Some(appointment_id) = self.appointment_id {
            f.insert("appointment_id".into(), json!(appointment_id));
        }
        f
    }
}

#[derive(Debug, Clone, Default)]
pub struct BudgetFilter {
    pub status: Option<BudgetStatus>,
    pub patient_id: Option<Uuid>,
}

impl BudgetFilter {
    pub(crate) fn to_eq(&self) -> EqFilter {
        let mut f = EqFilter::new();
        if let Some(status) = self.status {
            f.insert("status".into(), json!(status.as_str()));
        }
        if let Some(patient_id) = self.patient_id {
            f.insert("patient_id".into(), json!(patient_id));
        }
        f
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExamFilter {
    pub status: Option<ExamStatus>,
    pub patient_name: Option<String>,
}

impl ExamFilter {
    pub(crate) fn to_eq(&self) -> EqFilter {
        let mut f = EqFilter::new();
        if let Some(status) = self.status {
            f.insert("status".into(), json!(status.as_str()));
        }
        if let Some(ref name) = self.patient_name {
            f.insert("patient_name".into(), json!(name));
        }
        f
    }
}
