//! Status labels shown next to a citizen or car.

use pk_core::TransportFlag;

use crate::state::{ExtCitizen, ExtCitizenInstance, ExtPathMode};

/// What a pedestrian is doing, if the trip state says anything about it.
pub fn citizen_status_label(ext: &ExtCitizenInstance, citizen: &ExtCitizen) -> Option<&'static str> {
    use ExtPathMode::*;
    match ext.path_mode {
        ApproachingParkedCar | RequiresCarPath | RequiresMixedCarPathToTarget => Some("Entering vehicle"),
        RequiresWalkingPathToParkedCar | CalculatingWalkingPathToParkedCar | WalkingToParkedCar => {
            Some("Walking to car")
        }
        CalculatingWalkingPathToTarget | TaxiToTarget | WalkingToTarget => {
            if citizen.transport_mode.contains(TransportFlag::PublicTransport) {
                Some("Using public transport")
            } else {
                Some("Walking")
            }
        }
        CalculatingCarPathToTarget | CalculatingCarPathToKnownParkPos => Some("Thinking of a good parking spot"),
        _ => Option::None,
    }
}

/// What a car's driver is doing about parking.
pub fn car_status_label(driver: &ExtCitizenInstance) -> Option<String> {
    use ExtPathMode::*;
    let label = match driver.path_mode {
        DrivingToAltParkPos if driver.failed_parking_attempts > 1 => {
            return Some(format!("Driving to another parking spot (#{})", driver.failed_parking_attempts));
        }
        DrivingToAltParkPos | CalculatingCarPathToKnownParkPos | DrivingToKnownParkPos => {
            "Driving to a parking spot"
        }
        ParkingFailed | CalculatingCarPathToAltParkPos => "Looking for a parking spot",
        RequiresWalkingPathToTarget => "Parking",
        _ => return Option::None,
    };
    Some(label.to_owned())
}

/// `"{label}, {status}"`, or `status` unchanged when there is no label.
pub fn enrich_citizen_status(status: &str, ext: &ExtCitizenInstance, citizen: &ExtCitizen) -> String {
    match citizen_status_label(ext, citizen) {
        Some(label) => format!("{label}, {status}"),
        None => status.to_owned(),
    }
}

pub fn enrich_car_status(status: &str, driver: &ExtCitizenInstance) -> String {
    match car_status_label(driver) {
        Some(label) => format!("{label}, {status}"),
        None => status.to_owned(),
    }
}
