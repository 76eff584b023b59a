use chrono::NaiveDate;
use mela_shared::Masked;
use serde::{Deserialize, Serialize};

pub const MIN_ADULTS: i64 = 1;
pub const MAX_ADULTS: i64 = 50;
pub const MIN_KIDS: i64 = 0;
pub const MAX_KIDS: i64 = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingType {
    Individual,
    School,
    Group,
}

impl BookingType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "individual" => Some(Self::Individual),
            "school" => Some(Self::School),
            "group" => Some(Self::Group),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::School => "school",
            Self::Group => "group",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum FoodOption {
    #[default]
    WithFood,
    WithoutFood,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    #[default]
    Standard,
    School,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Birthday {
    pub month: u8,
    pub day: u8,
}

/// Birthday as submitted; either part may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BirthdayInput {
    pub month: Option<i64>,
    pub day: Option<i64>,
}

/// The registration form exactly as the visitor submitted it.
///
/// Missing fields fall back to the form's initial values (individual booking,
/// one adult, no kids, 18:00 exit, standard package).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingForm {
    pub name: String,
    pub email: Masked<String>,
    pub phone: Masked<String>,
    pub booking_type: String,
    pub adults_count: i64,
    pub kids_count: i64,
    pub food_option: Option<FoodOption>,
    pub without_food: Option<bool>,
    pub package_type: Option<PackageType>,
    pub exit_time: String,
    pub visit_date: String,
    pub birthday: Option<BirthdayInput>,
}

impl Default for BookingForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            email: Masked(String::new()),
            phone: Masked(String::new()),
            booking_type: BookingType::Individual.as_str().to_string(),
            adults_count: 1,
            kids_count: 0,
            food_option: None,
            without_food: None,
            package_type: None,
            exit_time: "18:00".to_string(),
            visit_date: String::new(),
            birthday: None,
        }
    }
}

impl BookingForm {
    /// An explicit food option wins over the legacy `withoutFood` checkbox.
    pub fn resolved_food(&self) -> FoodOption {
        match (self.food_option, self.without_food) {
            (Some(option), _) => option,
            (None, Some(true)) => FoodOption::WithoutFood,
            _ => FoodOption::WithFood,
        }
    }

    pub fn resolved_package(&self) -> PackageType {
        self.package_type.unwrap_or_default()
    }
}

/// Who is coming. Individual bookings always mean one adult and no kids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Individual,
    Group { adults: u32, kids: u32 },
    School { adults: u32, kids: u32 },
}

impl Party {
    pub fn booking_type(&self) -> BookingType {
        match self {
            Party::Individual => BookingType::Individual,
            Party::Group { .. } => BookingType::Group,
            Party::School { .. } => BookingType::School,
        }
    }

    pub fn adults(&self) -> u32 {
        match self {
            Party::Individual => 1,
            Party::Group { adults, .. } | Party::School { adults, .. } => *adults,
        }
    }

    pub fn kids(&self) -> u32 {
        match self {
            Party::Individual => 0,
            Party::Group { kids, .. } | Party::School { kids, .. } => *kids,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub email: Masked<String>,
    pub phone: Masked<String>,
}

impl Contact {
    /// Last four digits of the phone number, used in pass validation keys.
    pub fn phone_suffix(&self) -> &str {
        let phone = self.phone.expose();
        let start = phone.len().saturating_sub(4);
        phone.get(start..).unwrap_or(phone)
    }
}

/// A booking that passed every field rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub contact: Contact,
    pub party: Party,
    pub food: FoodOption,
    pub package: PackageType,
    pub exit_time: String,
    pub visit_date: NaiveDate,
    pub birthday: Option<Birthday>,
}

impl BookingRequest {
    pub fn booking_type(&self) -> BookingType {
        self.party.booking_type()
    }

    pub fn adults(&self) -> u32 {
        self.party.adults()
    }

    pub fn kids(&self) -> u32 {
        self.party.kids()
    }

    /// School rates apply to school bookings and to any booking on the school package.
    pub fn uses_school_rates(&self) -> bool {
        self.booking_type() == BookingType::School || self.package == PackageType::School
    }
}
