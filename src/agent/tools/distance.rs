//! Great-circle distance tool.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;

use super::base::{require_f64, Tool, ToolOutcome};
use crate::errors::ToolErrorKind;

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Compute great-circle distance between two coordinate pairs (haversine).
pub struct DistanceTool;

/// Haversine distance in kilometers, rounded to 2 decimal places.
fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let distance = 2.0 * EARTH_RADIUS_KM * a.sqrt().asin();

    (distance * 100.0).round() / 100.0
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<(), ToolErrorKind> {
    if !value.is_finite() || value < min || value > max {
        return Err(ToolErrorKind::InvalidArguments(format!(
            "'{}' out of range: {} not in [{}, {}]",
            name, value, min, max
        )));
    }
    Ok(())
}

#[async_trait]
impl Tool for DistanceTool {
    fn name(&self) -> &str {
        "calculate_distance"
    }

    fn description(&self) -> &str {
        "Calculate the great-circle distance in kilometers between two points given as latitude/longitude pairs."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "lat1": { "type": "number", "description": "Latitude of the first point (-90 to 90)" },
                "lon1": { "type": "number", "description": "Longitude of the first point (-180 to 180)" },
                "lat2": { "type": "number", "description": "Latitude of the second point (-90 to 90)" },
                "lon2": { "type": "number", "description": "Longitude of the second point (-180 to 180)" }
            },
            "required": ["lat1", "lon1", "lat2", "lon2"]
        })
    }

    async fn invoke(&self, args: HashMap<String, serde_json::Value>) -> ToolOutcome {
        let parsed = (|| {
            let lat1 = require_f64(&args, "lat1")?;
            let lon1 = require_f64(&args, "lon1")?;
            let lat2 = require_f64(&args, "lat2")?;
            let lon2 = require_f64(&args, "lon2")?;
            check_range("lat1", lat1, -90.0, 90.0)?;
            check_range("lon1", lon1, -180.0, 180.0)?;
            check_range("lat2", lat2, -90.0, 90.0)?;
            check_range("lon2", lon2, -180.0, 180.0)?;
            Ok::<_, ToolErrorKind>((lat1, lon1, lat2, lon2))
        })();

        match parsed {
            Ok((lat1, lon1, lat2, lon2)) => {
                let km = haversine_km(lat1, lon1, lat2, lon2);
                ToolOutcome::success(format!("{:.2}", km))
            }
            Err(kind) => ToolOutcome::failure(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> HashMap<String, serde_json::Value> {
        let mut m = HashMap::new();
        m.insert("lat1".to_string(), json!(lat1));
        m.insert("lon1".to_string(), json!(lon1));
        m.insert("lat2".to_string(), json!(lat2));
        m.insert("lon2".to_string(), json!(lon2));
        m
    }

    #[tokio::test]
    async fn test_chicago_to_sydney() {
        let tool = DistanceTool;
        let result = tool
            .invoke(args(41.8781, -87.6298, -33.8688, 151.2093))
            .await;
        assert!(result.ok);
        assert_eq!(result.data, "14875.88");
    }

    #[tokio::test]
    async fn test_berlin_to_paris() {
        let tool = DistanceTool;
        let result = tool.invoke(args(52.5200, 13.4050, 48.8566, 2.3522)).await;
        assert!(result.ok);
        assert_eq!(result.data, "877.46");
    }

    #[tokio::test]
    async fn test_symmetry() {
        let tool = DistanceTool;
        let forward = tool.invoke(args(40.7128, -74.0060, 51.5074, -0.1278)).await;
        let backward = tool.invoke(args(51.5074, -0.1278, 40.7128, -74.0060)).await;
        assert_eq!(forward.data, backward.data);
        assert_eq!(forward.data, "5570.22");
    }

    #[tokio::test]
    async fn test_identical_points_zero() {
        let tool = DistanceTool;
        let result = tool.invoke(args(1.3521, 103.8198, 1.3521, 103.8198)).await;
        assert!(result.ok);
        assert_eq!(result.data, "0.00");
    }

    #[tokio::test]
    async fn test_latitude_out_of_range() {
        let tool = DistanceTool;
        let result = tool.invoke(args(91.0, 0.0, 0.0, 0.0)).await;
        assert!(!result.ok);
        assert!(matches!(
            result.error_kind,
            Some(crate::errors::ToolErrorKind::InvalidArguments(_))
        ));
    }

    #[tokio::test]
    async fn test_longitude_out_of_range() {
        let tool = DistanceTool;
        let result = tool.invoke(args(0.0, -180.5, 0.0, 0.0)).await;
        assert!(!result.ok);
    }

    #[tokio::test]
    async fn test_missing_argument() {
        let tool = DistanceTool;
        let mut m = HashMap::new();
        m.insert("lat1".to_string(), json!(10.0));
        let result = tool.invoke(m).await;
        assert!(!result.ok);
        assert!(result.data.contains("lon1"));
    }

    #[test]
    fn test_antipodal_half_circumference() {
        assert_eq!(haversine_km(0.0, 0.0, 0.0, 180.0), 20015.09);
    }
}
