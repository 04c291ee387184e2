//! Landscape product catalog and output projection selection

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::AreaOfInterest;

/// Fire behavior fuel model set carried by a product
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FuelModel {
    /// Anderson 13 fuel models
    Fbfm13,
    /// Scott and Burgan 40 fuel models
    Fbfm40,
}

/// Coverage region of a product
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    /// Contiguous United States
    Conus,
    /// Alaska
    Alaska,
    /// Hawaii
    Hawaii,
}

impl Region {
    /// Coarse rectangle used to pick a region for an area
    pub fn bounds(&self) -> AreaOfInterest {
        match self {
            Region::Conus => AreaOfInterest::from_edges(-136.0, 22.0, -60.0, 52.0),
            Region::Alaska => AreaOfInterest::from_edges(-179.0, 50.0, -125.0, 75.0),
            Region::Hawaii => AreaOfInterest::from_edges(-170.0, 15.0, -150.0, 25.0),
        }
    }

    /// Region whose rectangle fully contains `area`
    pub fn containing(area: &AreaOfInterest) -> Option<Region> {
        [Region::Conus, Region::Alaska, Region::Hawaii]
            .into_iter()
            .find(|r| area.is_within(&r.bounds()))
    }
}

/// A landscape product offered by the service
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Product {
    /// Layer identifier sent as LAYER_IDS
    pub code: &'static str,
    /// Coverage region
    pub region: Region,
    /// Data vintage label
    pub version: &'static str,
    /// Fuel model set
    pub fuel_model: FuelModel,
}

macro_rules! product {
    ($code:literal, $region:ident, $version:literal, $fuel:ident) => {
        Product {
            code: $code,
            region: Region::$region,
            version: $version,
            fuel_model: FuelModel::$fuel,
        }
    };
}

/// Known products, oldest vintage first within each region
pub const CATALOG: &[Product] = &[
    product!("LCP07HZ", Conus, "us_100", Fbfm13),
    product!("LC409HZ", Conus, "us_100", Fbfm40),
    product!("F3V18HZ", Conus, "us_105", Fbfm13),
    product!("F3W19HZ", Conus, "us_105", Fbfm40),
    product!("F4V20HZ", Conus, "us_110", Fbfm13),
    product!("F4W21HZ", Conus, "us_110", Fbfm40),
    product!("F8V30HZ", Conus, "us_120", Fbfm13),
    product!("F8W31HZ", Conus, "us_120", Fbfm40),
    product!("F1I16HZ", Alaska, "ak_100", Fbfm13),
    product!("F1J17HZ", Alaska, "ak_100", Fbfm40),
    product!("F6B26HZ", Alaska, "ak_105", Fbfm13),
    product!("F6C27HZ", Alaska, "ak_105", Fbfm40),
    product!("F7B28HZ", Alaska, "ak_110", Fbfm13),
    product!("F7C29HZ", Alaska, "ak_110", Fbfm40),
    product!("F3722HZ", Hawaii, "hi_105", Fbfm13),
    product!("F3823HZ", Hawaii, "hi_105", Fbfm40),
    product!("F4724HZ", Hawaii, "hi_110", Fbfm13),
    product!("F4825HZ", Hawaii, "hi_110", Fbfm40),
];

impl Product {
    /// Look up a product by its layer code (case-insensitive)
    pub fn by_code(code: &str) -> Option<Product> {
        CATALOG
            .iter()
            .find(|p| p.code.eq_ignore_ascii_case(code))
            .copied()
    }

    /// Newest product of `fuel_model` covering `region`
    pub fn latest(region: Region, fuel_model: FuelModel) -> Option<Product> {
        CATALOG
            .iter()
            .rev()
            .find(|p| p.region == region && p.fuel_model == fuel_model)
            .copied()
    }

    /// Default product for an area: newest FBFM13 product of the containing region
    pub fn for_area(area: &AreaOfInterest) -> Result<Product> {
        Region::containing(area)
            .and_then(|region| Product::latest(region, FuelModel::Fbfm13))
            .ok_or_else(|| Error::InvalidArea(format!("failed to locate product for {area}")))
    }
}

/// EPSG code of the WGS84 UTM zone containing a point
///
/// Northern hemisphere codes are 326xx, southern 327xx. Handles the Norway
/// and Svalbard zone exceptions.
pub fn utm_epsg(lon: f64, lat: f64) -> u32 {
    let base = if lat < 0.0 { 32700 } else { 32600 };

    let zone = if lon == 180.0 {
        60
    } else if (56.0..64.0).contains(&lat) && (3.0..12.0).contains(&lon) {
        32
    } else if (72.0..84.0).contains(&lat) && (0.0..42.0).contains(&lon) {
        if lon < 9.0 {
            31
        } else if lon < 21.0 {
            33
        } else if lon < 33.0 {
            35
        } else {
            37
        }
    } else {
        ((lon + 186.0) / 6.0).floor() as u32
    };

    base + zone
}

/// EPSG code of the UTM zone containing the centre of `area`
pub fn area_utm_epsg(area: &AreaOfInterest) -> u32 {
    let (lon, lat) = area.center();
    utm_epsg(lon, lat)
}
