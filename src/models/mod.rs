pub mod appointment;
pub mod budget;
pub mod doctor;
pub mod enums;
pub mod exam;
pub mod filters;
pub mod patient;
pub mod settings;
pub mod transaction;

pub use appointment::{Appointment, AppointmentPatch, NewAppointment};
pub use budget::{Budget, BudgetItem, BudgetPatch, NewBudget};
pub use doctor::{Doctor, DoctorPatch, NewDoctor};
pub use exam::{Exam, ExamFile, ExamPatch, NewExam};
pub use filters::{
    AppointmentFilter, BudgetFilter, DoctorFilter, ExamFilter, PatientFilter, TransactionFilter,
};
pub use patient::{NewPatient, Patient, PatientPatch};
pub use settings::{ClinicSettings, SettingsUpdate};
pub use transaction::{NewTransaction, Transaction, TransactionPatch};
