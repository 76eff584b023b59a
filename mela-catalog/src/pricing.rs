use serde::{Deserialize, Serialize};

use mela_core::booking::{BookingForm, BookingRequest, BookingType, FoodOption, PackageType};

pub const INVALID_AMOUNT: &str = "Invalid amount. Please select a valid combo.";

/// Per-head rate for one kind of visitor, in major currency units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeadRate {
    pub with_food: u32,
    pub without_food: u32,
}

impl HeadRate {
    pub fn for_food(&self, food: FoodOption) -> u32 {
        match food {
            FoodOption::WithFood => self.with_food,
            FoodOption::WithoutFood => self.without_food,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchoolRate {
    pub adult: u32,
    pub kid: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateTable {
    pub adult: HeadRate,
    pub kid: HeadRate,
    pub school: SchoolRate,
}

impl Default for RateTable {
    fn default() -> Self {
        // Without-food rates are zero in the published price list.
        Self {
            adult: HeadRate { with_food: 499, without_food: 0 },
            kid: HeadRate { with_food: 399, without_food: 0 },
            school: SchoolRate { adult: 349, kid: 0 },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PricingMode {
    #[default]
    Paid,
    Free,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    pub rates: RateTable,
    pub mode: PricingMode,
    pub currency_symbol: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            rates: RateTable::default(),
            mode: PricingMode::Paid,
            currency_symbol: "₹".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RateKind {
    School,
    WithFood,
    WithoutFood,
    Free,
}

/// The total shown under the form. Never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub adults: u32,
    pub kids: u32,
    pub adult_rate: u32,
    pub kid_rate: u32,
    pub rate_kind: RateKind,
    pub total: u32,
    pub display: String,
}

impl PriceQuote {
    pub fn is_free(&self) -> bool {
        self.rate_kind == RateKind::Free
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("{}", INVALID_AMOUNT)]
    NotChargeable { total: u32 },
}

/// Computes prices from the injected rate table.
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn mode(&self) -> PricingMode {
        self.config.mode
    }

    pub fn quote(&self, booking: &BookingRequest) -> PriceQuote {
        self.quote_parts(
            booking.booking_type(),
            booking.package,
            booking.food,
            booking.adults(),
            booking.kids(),
        )
    }

    /// Live quote for a form that may not validate yet.
    ///
    /// Individual bookings count as one adult. Unknown booking types price as
    /// a group, negative counts as zero.
    pub fn quote_form(&self, form: &BookingForm) -> PriceQuote {
        let booking_type = BookingType::parse(&form.booking_type).unwrap_or(BookingType::Group);
        let (adults, kids) = match booking_type {
            BookingType::Individual => (1, 0),
            _ => (clamp_count(form.adults_count), clamp_count(form.kids_count)),
        };
        self.quote_parts(
            booking_type,
            form.resolved_package(),
            form.resolved_food(),
            adults,
            kids,
        )
    }

    pub fn quote_parts(
        &self,
        booking_type: BookingType,
        package: PackageType,
        food: FoodOption,
        adults: u32,
        kids: u32,
    ) -> PriceQuote {
        let rates = &self.config.rates;

        let (rate_kind, adult_rate, kid_rate) = if self.config.mode == PricingMode::Free {
            (RateKind::Free, 0, 0)
        } else if booking_type == BookingType::School || package == PackageType::School {
            (RateKind::School, rates.school.adult, rates.school.kid)
        } else {
            let kind = match food {
                FoodOption::WithFood => RateKind::WithFood,
                FoodOption::WithoutFood => RateKind::WithoutFood,
            };
            (kind, rates.adult.for_food(food), rates.kid.for_food(food))
        };

        let total = adults
            .saturating_mul(adult_rate)
            .saturating_add(kids.saturating_mul(kid_rate));

        let display = if rate_kind == RateKind::Free {
            "Free".to_string()
        } else {
            format!("{}{}", self.config.currency_symbol, total)
        };

        PriceQuote {
            adults,
            kids,
            adult_rate,
            kid_rate,
            rate_kind,
            total,
            display,
        }
    }

    /// A paid booking must cost something before an order is created.
    pub fn ensure_chargeable(&self, quote: &PriceQuote) -> Result<u32, PricingError> {
        if quote.total == 0 {
            return Err(PricingError::NotChargeable { total: quote.total });
        }
        Ok(quote.total)
    }

    /// Line shown in the checkout widget.
    pub fn checkout_description(&self, booking: &BookingRequest) -> &'static str {
        if booking.booking_type() == BookingType::School {
            "School Package Booking"
        } else if booking.food == FoodOption::WithoutFood {
            "Without Food Package Booking"
        } else {
            "With Food Package Booking"
        }
    }
}

fn clamp_count(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}
