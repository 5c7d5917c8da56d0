use crate::client::VacasaConnect;
use crate::error::ConnectError;
use crate::params::{Params, add_include_param, add_meta_param};
use futures_core::Stream;
use serde_json::Value;

/// Extra data requested with [`VacasaConnect::get_units`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct UnitsOptions {
    /// Adds the `photos_list` meta block.
    pub include_photos: bool,
    /// Keep terminated units; they are filtered out otherwise.
    pub include_terminated: bool,
    /// Adds the `amenities_map` meta block.
    pub include_amenities: bool,
}

/// Sideloads requested with [`VacasaConnect::get_amenities`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct AmenitiesOptions {
    pub include_categories: bool,
    pub include_content: bool,
    pub include_options: bool,
}

impl UnitsOptions {
    pub(crate) fn apply(self, params: &mut Params) {
        if self.include_photos {
            add_meta_param(params, "photos_list");
        }
        if self.include_amenities {
            add_meta_param(params, "amenities_map");
        }
        if !self.include_terminated {
            params.insert("filter[terminated]".to_owned(), "0".to_owned());
        }
    }
}

impl AmenitiesOptions {
    pub(crate) fn apply(self, params: &mut Params) {
        if self.include_categories {
            add_include_param(params, "categories");
        }
        if self.include_content {
            add_include_param(params, "content");
        }
        if self.include_options {
            add_include_param(params, "options");
        }
    }
}

impl VacasaConnect {
    /// Iterate units.
    pub fn get_units(
        &self,
        mut params: Params,
        options: UnitsOptions,
    ) -> impl Stream<Item = Result<Value, ConnectError>> + Send + '_ {
        options.apply(&mut params);
        let url = self.v1_url("units");
        self.paginate(&url, params, None, None)
    }

    /// Fetch one unit and return its `data` object.
    ///
    /// # Errors
    /// Returns [`ConnectError::InvalidEnvelope`] when the body has no `data`,
    /// otherwise the errors of [`VacasaConnect::get`].
    pub async fn get_unit_by_id(&self, unit_id: u64, params: &Params) -> Result<Value, ConnectError> {
        let mut body = self.get(&format!("units/{unit_id}"), params).await?;
        match body.get_mut("data") {
            Some(data) => Ok(data.take()),
            None => Err(ConnectError::InvalidEnvelope(format!(
                "unit {unit_id}: missing `data` field"
            ))),
        }
    }

    /// Iterate availability records.
    pub fn get_availability(
        &self,
        params: Params,
    ) -> impl Stream<Item = Result<Value, ConnectError>> + Send + '_ {
        let url = self.v1_url("availability");
        self.paginate(&url, params, None, None)
    }

    /// Iterate the availability of one unit.
    pub fn get_availability_by_id(
        &self,
        unit_id: u64,
        mut params: Params,
    ) -> impl Stream<Item = Result<Value, ConnectError>> + Send + '_ {
        params.insert("filter[unit_id]".to_owned(), unit_id.to_string());
        self.get_availability(params)
    }

    /// Iterate the master list of amenities.
    pub fn get_amenities(
        &self,
        mut params: Params,
        options: AmenitiesOptions,
    ) -> impl Stream<Item = Result<Value, ConnectError>> + Send + '_ {
        options.apply(&mut params);
        let url = self.v1_url("amenities");
        self.paginate(&url, params, None, None)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn default_units_options_hide_terminated() {
        let mut params = Params::new();
        UnitsOptions::default().apply(&mut params);
        assert_eq!(params.len(), 1);
        assert_eq!(params["filter[terminated]"], "0");
    }

    #[test]
    fn units_options_add_meta_blocks() {
        let mut params = Params::new();
        UnitsOptions {
            include_photos: true,
            include_terminated: true,
            include_amenities: true,
        }
        .apply(&mut params);
        assert_eq!(params["include_meta"], ",photos_list,amenities_map");
        assert!(!params.contains_key("filter[terminated]"));
    }

    #[test]
    fn amenities_options_build_include() {
        let mut params = Params::new();
        AmenitiesOptions {
            include_categories: true,
            include_content: false,
            include_options: true,
        }
        .apply(&mut params);
        assert_eq!(params["include"], "categories,options");
    }

    #[test]
    fn no_amenities_options_no_include() {
        let mut params = Params::new();
        AmenitiesOptions::default().apply(&mut params);
        assert!(params.is_empty());
    }
}
