use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;

use crate::register_toolbelt;

#[derive(Debug)]
pub struct CityZone {
    pub name: &'static str,
    pub zone: Tz,
}

pub static CITY_ZONES: &[CityZone] = &[
    CityZone { name: "New York", zone: chrono_tz::America::New_York },
    CityZone { name: "London", zone: chrono_tz::Europe::London },
    CityZone { name: "Tokyo", zone: chrono_tz::Asia::Tokyo },
    CityZone { name: "Paris", zone: chrono_tz::Europe::Paris },
    CityZone { name: "Sydney", zone: chrono_tz::Australia::Sydney },
    CityZone { name: "Dubai", zone: chrono_tz::Asia::Dubai },
    CityZone { name: "Singapore", zone: chrono_tz::Asia::Singapore },
    CityZone { name: "Los Angeles", zone: chrono_tz::America::Los_Angeles },
    CityZone { name: "Chicago", zone: chrono_tz::America::Chicago },
    CityZone { name: "Toronto", zone: chrono_tz::America::Toronto },
];

const TIME_FORMAT: &str = "%I:%M %p";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityTime {
    pub city: &'static str,
    pub time: String,
    pub timezone: &'static str,
    pub report: String,
}

#[derive(Debug, Error, PartialEq)]
#[error("City '{city}' not found. Available cities: {}", available_cities().join(", "))]
pub struct UnknownCity {
    pub city: String,
}

pub fn available_cities() -> Vec<&'static str> {
    CITY_ZONES.iter().map(|c| c.name).collect()
}

/// Case-insensitive lookup; surrounding whitespace is ignored.
pub fn lookup_city(name: &str) -> Option<&'static CityZone> {
    let needle = name.trim();
    CITY_ZONES.iter().find(|c| c.name.eq_ignore_ascii_case(needle))
}

pub fn time_in(city: &str, now: DateTime<Utc>) -> Result<CityTime, UnknownCity> {
    let entry = lookup_city(city).ok_or_else(|| UnknownCity {
        city: city.to_string(),
    })?;

    let time = now.with_timezone(&entry.zone).format(TIME_FORMAT).to_string();
    let timezone = entry.zone.name();

    Ok(CityTime {
        city: entry.name,
        report: format!("The current time in {} is {} ({})", entry.name, time, timezone),
        time,
        timezone,
    })
}

pub struct Clock;

impl Default for Clock {
    fn default() -> Self {
        Self
    }
}

register_toolbelt! {
    Clock {
        description: "World clock for a fixed set of cities",
        tools: {
            "get_current_time" => get_current_time {
                description: "Returns the current local time in a specified city. \
                              Supported cities: New York, London, Tokyo, Paris, Sydney, \
                              Dubai, Singapore, Los Angeles, Chicago, Toronto.",
                params: [
                    "city": "string" => "The name of the city to get the time for (e.g. 'New York', 'London', 'Tokyo')"
                ]
            }
        }
    }
}

impl Clock {
    fn get_current_time(&self, args: &serde_json::Value) -> Result<serde_json::Value> {
        let city = args["city"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Missing required string parameter 'city'"))?;

        let found = time_in(city, Utc::now())?;
        Ok(serde_json::to_value(found)?)
    }
}
