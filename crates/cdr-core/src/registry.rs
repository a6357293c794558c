//! Builds configured detectors from their persisted parameters.
//!
//! Every detector writes a `class` key into its [`ParameterData`]; that key
//! picks the concrete type when the parameters are read back.

use crate::detection::{CdCylinder, CdPolyIter, Detection3D, DetectionPolygon};
use crate::error::ParameterError;
use crate::parameters::ParameterData;

pub fn detection3d_from_parameters(p: &ParameterData) -> Option<Box<dyn Detection3D>> {
    let mut cd: Box<dyn Detection3D> = match p.get_string("class") {
        Some("CdCylinder") => Box::new(CdCylinder::default()),
        Some(other) => {
            tracing::warn!(class = other, "unknown state detector class");
            return None;
        }
        None => {
            tracing::warn!("detector parameters without a class");
            return None;
        }
    };
    cd.set_parameters(p);
    Some(cd)
}

pub fn detection_polygon_from_parameters(p: &ParameterData) -> Option<Box<dyn DetectionPolygon>> {
    let mut cd: Box<dyn DetectionPolygon> = match p.get_string("class") {
        Some("CdPolyIter") => Box::new(CdPolyIter::default()),
        Some(other) => {
            tracing::warn!(class = other, "unknown polygon detector class");
            return None;
        }
        None => {
            tracing::warn!("detector parameters without a class");
            return None;
        }
    };
    cd.set_parameters(p);
    Some(cd)
}

fn is_polygon_class(class: &str) -> bool {
    class == "CdPolyIter"
}

/// Detectors loaded from a parameter document, split by kind.
#[derive(Debug, Clone, Default)]
pub struct DetectorSet {
    pub state: Vec<Box<dyn Detection3D>>,
    pub polygon: Vec<Box<dyn DetectionPolygon>>,
}

impl DetectorSet {
    pub fn len(&self) -> usize {
        self.state.len() + self.polygon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find_state(&self, id: &str) -> Option<&dyn Detection3D> {
        self.state
            .iter()
            .find(|cd| cd.identifier() == id)
            .map(|cd| cd.as_ref())
    }

    pub fn find_polygon(&self, id: &str) -> Option<&dyn DetectionPolygon> {
        self.polygon
            .iter()
            .find(|cd| cd.identifier() == id)
            .map(|cd| cd.as_ref())
    }

    /// Parameters of every detector, state detectors first.
    pub fn parameters(&self) -> Vec<ParameterData> {
        self.state
            .iter()
            .map(|cd| cd.parameters())
            .chain(self.polygon.iter().map(|cd| cd.parameters()))
            .collect()
    }

    pub fn to_json(&self) -> Result<String, ParameterError> {
        Ok(serde_json::to_string_pretty(&self.parameters())?)
    }
}

/// Builds every recognised detector; unknown classes are skipped.
pub fn load_detectors(params: &[ParameterData]) -> DetectorSet {
    let mut set = DetectorSet::default();
    for p in params {
        match p.get_string("class") {
            Some(class) if is_polygon_class(class) => {
                set.polygon.extend(detection_polygon_from_parameters(p));
            }
            _ => set.state.extend(detection3d_from_parameters(p)),
        }
    }
    tracing::debug!(
        state = set.state.len(),
        polygon = set.polygon.len(),
        skipped = params.len() - set.len(),
        "detectors loaded"
    );
    set
}

/// Reads a JSON array of parameter objects.
pub fn load_detectors_json(s: &str) -> Result<DetectorSet, ParameterError> {
    let params: Vec<ParameterData> = serde_json::from_str(s)?;
    for p in &params {
        p.validate()?;
    }
    Ok(load_detectors(&params))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cylinder_from_parameters() {
        let mut cyl = CdCylinder::new(1852.0, 300.0);
        cyl.set_identifier("tight");
        let cd = detection3d_from_parameters(&cyl.parameters()).unwrap();
        assert_eq!(cd.class_name(), "CdCylinder");
        assert_eq!(cd.identifier(), "tight");
        assert!(cd.equals(&cyl));
    }

    #[test]
    fn test_unknown_class_skipped() {
        let mut p = ParameterData::new();
        p.set_string("class", "WCV_TAUMOD");
        assert!(detection3d_from_parameters(&p).is_none());
        assert!(detection_polygon_from_parameters(&p).is_none());
        assert!(detection3d_from_parameters(&ParameterData::new()).is_none());

        let set = load_detectors(&[p, CdCylinder::default().parameters(), CdPolyIter::new(0.5).parameters()]);
        assert_eq!(set.state.len(), 1);
        assert_eq!(set.polygon.len(), 1);
    }

    #[test]
    fn test_json_document_round_trip() {
        let doc = r#"[
            {"class": {"value": "CdCylinder"}, "id": {"value": "wide"},
             "D": {"value": 10.0, "units": "nmi"}, "H": {"value": 2000.0, "units": "ft"}},
            {"class": {"value": "CdPolyIter"}, "id": {"value": "cells"},
             "timeStep": {"value": 0.5, "units": "s"}}
        ]"#;
        let set = load_detectors_json(doc).unwrap();
        assert_eq!(set.len(), 2);
        let wide = set.find_state("wide").unwrap();
        let d = wide.parameters().get_value("D").unwrap();
        assert!((d - 18_520.0).abs() < 1e-9);
        let cells = set.find_polygon("cells").unwrap();
        assert_eq!(cells.parameters().get_value("timeStep"), Some(0.5));
        assert!(set.find_state("cells").is_none());

        let again = load_detectors_json(&set.to_json().unwrap()).unwrap();
        assert!(again.find_state("wide").unwrap().equals(wide));
    }

    #[test]
    fn test_bad_unit_rejected() {
        let doc = r#"[{"class": {"value": "CdCylinder"}, "D": {"value": 5.0, "units": "furlong"}}]"#;
        assert!(matches!(
            load_detectors_json(doc),
            Err(ParameterError::UnknownUnit { .. })
        ));
    }
}
