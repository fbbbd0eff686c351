use crate::error::StoreError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The serde form matches the backend column string.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(StoreError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(PersonStatus {
    Active => "active",
    Inactive => "inactive",
});

str_enum!(AppointmentStatus {
    Scheduled => "scheduled",
    Confirmed => "confirmed",
    Completed => "completed",
    Cancelled => "cancelled",
});

str_enum!(TransactionKind {
    Revenue => "revenue",
    Expense => "expense",
});

str_enum!(TransactionStatus {
    Confirmed => "confirmed",
    Pending => "pending",
});

str_enum!(BudgetStatus {
    Pending => "pending",
    Paid => "paid",
    Overdue => "overdue",
});

str_enum!(PaymentMethod {
    Cash => "cash",
    Card => "card",
    Pix => "pix",
    Transfer => "transfer",
});

str_enum!(ExamStatus {
    Pending => "pending",
    Completed => "completed",
});
