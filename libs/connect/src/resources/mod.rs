//! Resource endpoint methods.
//!
//! Thin callers of [`VacasaConnect::get`], [`VacasaConnect::paginate`] and
//! [`VacasaConnect::authenticated_request`]: each builds the URL, query and
//! payload for one endpoint and returns the parsed response.

mod quote;
mod reservation;
mod units;

pub use quote::{QuoteRequest, TripProtection};
pub use reservation::{Guest, NewReservation, PaymentCard};
pub use units::{AmenitiesOptions, UnitsOptions};

use crate::client::VacasaConnect;
use crate::error::ConnectError;
use crate::params::Params;
use futures_core::Stream;
use http::Method;
use serde::Serialize;
use serde_json::{Value, json};

/// Paginated collections that take no options beyond query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Collection {
    AmenitiesGroups,
    UnitAmenities,
    UnitAmenitiesReduced,
    Cities,
    States,
    Countries,
    Destinations,
    Regions,
    RegionPhones,
    RegionCities,
    Guarantees,
    GuaranteeDates,
    Reviews,
    Reservations,
    Offices,
}

impl Collection {
    /// Path below `/v1/`.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::AmenitiesGroups => "amenities-groups",
            Self::UnitAmenities => "unit-amenities",
            Self::UnitAmenitiesReduced => "unit-amenities-reduced",
            Self::Cities => "cities",
            Self::States => "states",
            Self::Countries => "countries",
            Self::Destinations => "destinations",
            Self::Regions => "regions",
            Self::RegionPhones => "region-phones",
            Self::RegionCities => "region-cities",
            Self::Guarantees => "guarantees",
            Self::GuaranteeDates => "guarantee-dates",
            Self::Reviews => "reviews",
            Self::Reservations => "reservations",
            Self::Offices => "offices",
        }
    }
}

/// `{"data": {"attributes": ...}}`
fn attributes_envelope<T: Serialize + ?Sized>(attributes: &T) -> Result<Value, ConnectError> {
    Ok(json!({ "data": { "attributes": serde_json::to_value(attributes)? } }))
}

impl VacasaConnect {
    /// Iterate every item of a plain collection.
    pub fn list(
        &self,
        collection: Collection,
        params: Params,
    ) -> impl Stream<Item = Result<Value, ConnectError>> + Send + '_ {
        let url = self.v1_url(collection.path());
        self.paginate(&url, params, None, None)
    }

    /// POST `attributes` to `{endpoint}/v1/{path}` in a JSON:API envelope.
    ///
    /// # Errors
    /// Returns [`ConnectError::Json`] if `attributes` cannot be serialized,
    /// otherwise the errors of [`VacasaConnect::authenticated_request`].
    pub async fn create<T>(&self, path: &str, attributes: &T) -> Result<Value, ConnectError>
    where
        T: Serialize + ?Sized,
    {
        self.write(Method::POST, path, attributes).await
    }

    /// PATCH `attributes` to `{endpoint}/v1/{path}` in a JSON:API envelope.
    ///
    /// # Errors
    /// Same as [`VacasaConnect::create`].
    pub async fn update<T>(&self, path: &str, attributes: &T) -> Result<Value, ConnectError>
    where
        T: Serialize + ?Sized,
    {
        self.write(Method::PATCH, path, attributes).await
    }

    async fn write<T>(&self, method: Method, path: &str, attributes: &T) -> Result<Value, ConnectError>
    where
        T: Serialize + ?Sized,
    {
        let url = self.v1_url(path);
        let body = attributes_envelope(attributes)?;
        tracing::debug!(%method, url, "sending resource");
        let response = self
            .authenticated_request(method, &url, &Params::new(), Some(&body))
            .await?;
        Ok(response.json().await?)
    }
}
