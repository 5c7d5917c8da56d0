use crate::client::VacasaConnect;
use crate::error::ConnectError;
use crate::params::Params;
use http::Method;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Whether the guest asked for trip protection.
///
/// Sent as `1`, `-1` or `0`; the API treats the three states differently, so
/// this is not a `bool`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TripProtection {
    Yes,
    No,
    #[default]
    Undecided,
}

impl TripProtection {
    #[must_use]
    pub fn code(self) -> i8 {
        match self {
            Self::Yes => 1,
            Self::No => -1,
            Self::Undecided => 0,
        }
    }
}

impl From<Option<bool>> for TripProtection {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::Yes,
            Some(false) => Self::No,
            None => Self::Undecided,
        }
    }
}

impl Serialize for TripProtection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.code())
    }
}

/// Input of [`VacasaConnect::get_quote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub unit_id: u64,
    /// Check-in date, `YYYY-MM-DD`.
    pub arrival: String,
    /// Check-out date, `YYYY-MM-DD`.
    pub departure: String,
    pub adults: u32,
    pub children: u32,
    pub pets: u32,
    pub trip_protection: TripProtection,
    /// Overrides the client's `Accept-Language` for this call.
    pub language: Option<String>,
    /// Overrides the client's `X-Accept-Currency` for this call.
    pub currency: Option<String>,
}

impl QuoteRequest {
    #[must_use]
    pub fn new(
        unit_id: u64,
        arrival: impl Into<String>,
        departure: impl Into<String>,
        adults: u32,
    ) -> Self {
        Self {
            unit_id,
            arrival: arrival.into(),
            departure: departure.into(),
            adults,
            children: 0,
            pets: 0,
            trip_protection: TripProtection::Undecided,
            language: None,
            currency: None,
        }
    }

    #[must_use]
    pub fn children(mut self, children: u32) -> Self {
        self.children = children;
        self
    }

    #[must_use]
    pub fn pets(mut self, pets: u32) -> Self {
        self.pets = pets;
        self
    }

    #[must_use]
    pub fn trip_protection(mut self, trip_protection: TripProtection) -> Self {
        self.trip_protection = trip_protection;
        self
    }

    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// Query parameters; `trip_protection` only once decided.
    pub(crate) fn params(&self) -> Params {
        let mut params = Params::new();
        params.insert("adults".to_owned(), self.adults.to_string());
        params.insert("children".to_owned(), self.children.to_string());
        params.insert("pets".to_owned(), self.pets.to_string());
        params.insert("unit_id".to_owned(), self.unit_id.to_string());
        params.insert("arrival".to_owned(), self.arrival.clone());
        params.insert("departure".to_owned(), self.departure.clone());
        if self.trip_protection != TripProtection::Undecided {
            params.insert(
                "trip_protection".to_owned(),
                self.trip_protection.code().to_string(),
            );
        }
        params
    }
}

impl VacasaConnect {
    /// Price a stay.
    ///
    /// # Errors
    /// Returns [`ConnectError::Auth`] or [`ConnectError::Http`].
    pub async fn get_quote(&self, request: &QuoteRequest) -> Result<Value, ConnectError> {
        let url = self.v1_url("quotes");
        let response = self
            .send(
                Method::GET,
                &url,
                &request.params(),
                None::<&()>,
                request.language.as_deref(),
                request.currency.as_deref(),
            )
            .await?;
        Ok(response.json().await?)
    }
}
