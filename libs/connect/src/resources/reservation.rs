use crate::client::VacasaConnect;
use crate::error::ConnectError;
use crate::resources::quote::TripProtection;
use connect_utils::SecretString;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Guest details for a reservation.
#[derive(Debug, Clone, PartialEq)]
pub struct Guest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Free-form address, e.g. `{"address_1": "999 W Main St #301", "city": "Boise"}`.
    pub address: Value,
}

/// Card charged for the stay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCard {
    pub account_number: SecretString,
    /// Expiry in `mmyy` form.
    pub exp_mmyy: String,
}

/// Input of [`VacasaConnect::create_reservation`].
///
/// `phone` and `source` are always sent, as null when unset. `terms` and the
/// currency codes are left out of the payload unless set.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReservation {
    pub unit_id: u64,
    pub arrival: String,
    pub departure: String,
    pub adults: u32,
    pub children: u32,
    pub pets: u32,
    /// ID of a quote from [`VacasaConnect::get_quote`].
    pub quote_id: String,
    pub guest: Guest,
    pub card: PaymentCard,
    pub phone: Option<String>,
    pub trip_protection: TripProtection,
    /// Vacasa-issued code identifying the booking channel.
    pub source: Option<String>,
    /// When the guest accepted the terms, RFC 3339.
    pub terms: Option<String>,
    pub booked_currency_code: Option<String>,
    pub display_currency_code: Option<String>,
}

impl NewReservation {
    #[must_use]
    pub fn new(
        unit_id: u64,
        arrival: impl Into<String>,
        departure: impl Into<String>,
        adults: u32,
        quote_id: impl Into<String>,
        guest: Guest,
        card: PaymentCard,
    ) -> Self {
        Self {
            unit_id,
            arrival: arrival.into(),
            departure: departure.into(),
            adults,
            children: 0,
            pets: 0,
            quote_id: quote_id.into(),
            guest,
            card,
            phone: None,
            trip_protection: TripProtection::Undecided,
            source: None,
            terms: None,
            booked_currency_code: None,
            display_currency_code: None,
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
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    #[must_use]
    pub fn trip_protection(mut self, trip_protection: TripProtection) -> Self {
        self.trip_protection = trip_protection;
        self
    }

    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn terms(mut self, terms: impl Into<String>) -> Self {
        self.terms = Some(terms.into());
        self
    }

    #[must_use]
    pub fn booked_currency_code(mut self, code: impl Into<String>) -> Self {
        self.booked_currency_code = Some(code.into());
        self
    }

    #[must_use]
    pub fn display_currency_code(mut self, code: impl Into<String>) -> Self {
        self.display_currency_code = Some(code.into());
        self
    }

    fn attributes(&self) -> ReservationAttributes<'_> {
        ReservationAttributes {
            unit_id: self.unit_id,
            arrival: &self.arrival,
            departure: &self.departure,
            email: &self.guest.email,
            phone: self.phone.as_deref(),
            address: &self.guest.address,
            adults: self.adults,
            children: self.children,
            pets: self.pets,
            trip_protection: self.trip_protection,
            quote_id: &self.quote_id,
            first_name: &self.guest.first_name,
            last_name: &self.guest.last_name,
            account_number: &self.card.account_number,
            exp_mmyy: &self.card.exp_mmyy,
            source: self.source.as_deref(),
            terms: self.terms.as_deref(),
            booked_currency_code: self.booked_currency_code.as_deref(),
            display_currency_code: self.display_currency_code.as_deref(),
        }
    }
}

#[derive(Serialize)]
struct ReservationAttributes<'a> {
    unit_id: u64,
    arrival: &'a str,
    departure: &'a str,
    email: &'a str,
    phone: Option<&'a str>,
    address: &'a Value,
    adults: u32,
    children: u32,
    pets: u32,
    trip_protection: TripProtection,
    quote_id: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    #[serde(serialize_with = "expose_secret")]
    account_number: &'a SecretString,
    exp_mmyy: &'a str,
    source: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    terms: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    booked_currency_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_currency_code: Option<&'a str>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn expose_secret<S: Serializer>(secret: &&SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose())
}

impl VacasaConnect {
    /// Reserve a unit. POST `/v1/reservations`.
    ///
    /// # Errors
    /// Returns [`ConnectError::Auth`] or [`ConnectError::Http`].
    pub async fn create_reservation(
        &self,
        reservation: &NewReservation,
    ) -> Result<Value, ConnectError> {
        tracing::info!(
            unit_id = reservation.unit_id,
            arrival = %reservation.arrival,
            departure = %reservation.departure,
            "creating reservation"
        );
        self.create("reservations", &reservation.attributes()).await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    fn reservation() -> NewReservation {
        NewReservation::new(
            1,
            "2020-01-01",
            "2020-01-31",
            4,
            "foo",
            Guest {
                first_name: "Jane".to_owned(),
                last_name: "Doe".to_owned(),
                email: "test@vacasa.com".to_owned(),
                address: json!("123 Main St"),
            },
            PaymentCard {
                account_number: SecretString::from("bar"),
                exp_mmyy: "0130".to_owned(),
            },
        )
    }

    fn expected_without_optionals() -> Value {
        json!({
            "unit_id": 1,
            "arrival": "2020-01-01",
            "departure": "2020-01-31",
            "email": "test@vacasa.com",
            "address": "123 Main St",
            "adults": 4,
            "quote_id": "foo",
            "first_name": "Jane",
            "last_name": "Doe",
            "account_number": "bar",
            "exp_mmyy": "0130",
            "children": 0,
            "pets": 0,
            "trip_protection": 0,
            "phone": null,
            "source": null
        })
    }

    #[test]
    fn unset_terms_left_out() {
        let attributes = serde_json::to_value(reservation().attributes()).unwrap();
        assert_eq!(attributes, expected_without_optionals());
        assert!(attributes.get("terms").is_none());
    }

    #[test]
    fn terms_passed_verbatim() {
        let attributes =
            serde_json::to_value(reservation().terms("2019-04-30T16:00:00Z").attributes()).unwrap();
        let mut expected = expected_without_optionals();
        expected["terms"] = json!("2019-04-30T16:00:00Z");
        assert_eq!(attributes, expected);
    }

    #[test]
    fn currency_codes_passed_when_set() {
        let attributes = serde_json::to_value(
            reservation()
                .booked_currency_code("CLP")
                .display_currency_code("CLP")
                .attributes(),
        )
        .unwrap();
        assert_eq!(attributes["booked_currency_code"], "CLP");
        assert_eq!(attributes["display_currency_code"], "CLP");
    }

    #[test]
    fn optional_contact_fields_and_trip_protection() {
        let attributes = serde_json::to_value(
            reservation()
                .phone("555-0100")
                .source("web")
                .children(2)
                .trip_protection(TripProtection::Yes)
                .attributes(),
        )
        .unwrap();
        assert_eq!(attributes["phone"], "555-0100");
        assert_eq!(attributes["source"], "web");
        assert_eq!(attributes["children"], 2);
        assert_eq!(attributes["trip_protection"], 1);
    }

    #[test]
    fn card_number_redacted_in_debug() {
        let debug = format!("{:?}", reservation());
        assert!(!debug.contains("\"bar\""));
        assert!(debug.contains("[REDACTED]"));
    }
}
