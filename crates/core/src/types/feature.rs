//! The closed set of property features the price model is fitted on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A modeled property feature.
///
/// Declaration order is significant: it is the iteration order of
/// [`FeatureVector`](super::FeatureVector) and the summation order of the
/// linear predictor, so floating-point results are reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Feature {
    /// Road distance to the reference city centre, in km.
    MlBelgradeDistance,
    NumOfRooms,
    NumOfBathrooms,
    /// Floor area in square meters.
    SqMeters,
    YearBuilt,
    Floor,
    TotalFloors,
    /// Legal registration of the property (indicator).
    Registered,
    FloorHeating,
    HeatPumpHeating,
    CentralHeating,
    ElectricHeating,
    SolidFuelHeating,
    GasHeating,
    ThermalStorage,
    AirCon,
    Parking,
    Garage,
    Elevator,
    Balcony,
    Basement,
    Pool,
    Garden,
    Reception,
}

impl Feature {
    /// Number of modeled features.
    pub const COUNT: usize = 24;

    /// Every feature, in declaration order.
    pub const ALL: [Feature; Self::COUNT] = [
        Feature::MlBelgradeDistance,
        Feature::NumOfRooms,
        Feature::NumOfBathrooms,
        Feature::SqMeters,
        Feature::YearBuilt,
        Feature::Floor,
        Feature::TotalFloors,
        Feature::Registered,
        Feature::FloorHeating,
        Feature::HeatPumpHeating,
        Feature::CentralHeating,
        Feature::ElectricHeating,
        Feature::SolidFuelHeating,
        Feature::GasHeating,
        Feature::ThermalStorage,
        Feature::AirCon,
        Feature::Parking,
        Feature::Garage,
        Feature::Elevator,
        Feature::Balcony,
        Feature::Basement,
        Feature::Pool,
        Feature::Garden,
        Feature::Reception,
    ];

    /// Position of this feature in [`Feature::ALL`].
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Wire name used in request bodies and snapshot files.
    pub const fn name(self) -> &'static str {
        match self {
            Feature::MlBelgradeDistance => "mlBelgradeDistance",
            Feature::NumOfRooms => "numOfRooms",
            Feature::NumOfBathrooms => "numOfBathrooms",
            Feature::SqMeters => "sqMeters",
            Feature::YearBuilt => "yearBuilt",
            Feature::Floor => "floor",
            Feature::TotalFloors => "totalFloors",
            Feature::Registered => "registered",
            Feature::FloorHeating => "floorHeating",
            Feature::HeatPumpHeating => "heatPumpHeating",
            Feature::CentralHeating => "centralHeating",
            Feature::ElectricHeating => "electricHeating",
            Feature::SolidFuelHeating => "solidFuelHeating",
            Feature::GasHeating => "gasHeating",
            Feature::ThermalStorage => "thermalStorage",
            Feature::AirCon => "airCon",
            Feature::Parking => "parking",
            Feature::Garage => "garage",
            Feature::Elevator => "elevator",
            Feature::Balcony => "balcony",
            Feature::Basement => "basement",
            Feature::Pool => "pool",
            Feature::Garden => "garden",
            Feature::Reception => "reception",
        }
    }

    /// Storage column holding this feature in the inventory and
    /// coefficient tables.
    pub const fn column(self) -> &'static str {
        match self {
            Feature::MlBelgradeDistance => "ml_belgrade_distance",
            Feature::NumOfRooms => "num_of_rooms",
            Feature::NumOfBathrooms => "num_of_bathrooms",
            Feature::SqMeters => "sq_meters",
            Feature::YearBuilt => "year_built",
            Feature::Floor => "floor",
            Feature::TotalFloors => "total_floors",
            Feature::Registered => "registration",
            Feature::FloorHeating => "floor_heating",
            Feature::HeatPumpHeating => "heat_pump_heating",
            Feature::CentralHeating => "central_heating",
            Feature::ElectricHeating => "electric_heating",
            Feature::SolidFuelHeating => "solid_fuel_heating",
            Feature::GasHeating => "gas_heating",
            Feature::ThermalStorage => "thermal_storage",
            Feature::AirCon => "air_con",
            Feature::Parking => "parking",
            Feature::Garage => "garage",
            Feature::Elevator => "elevator",
            Feature::Balcony => "balcony",
            Feature::Basement => "basement",
            Feature::Pool => "pool",
            Feature::Garden => "garden",
            Feature::Reception => "reception",
        }
    }

    /// Whether the feature is a boolean amenity/condition indicator (0/1).
    pub const fn is_indicator(self) -> bool {
        self.index() >= Feature::Registered.index()
    }

    /// Look up a feature by its wire name.
    pub fn from_name(name: &str) -> Option<Feature> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
