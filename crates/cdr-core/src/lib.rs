//! Conflict detection geometry for aircraft against other aircraft and
//! against moving polygonal regions.
//!
//! Pairwise kernels live in [`detection`]; [`sequencer`] runs them along
//! trajectories and merges the per-leg results into a [`ConflictList`].

pub mod conflict_list;
pub mod detection;
pub mod error;
pub mod error_log;
pub mod geodesy;
pub mod moving_polygon;
pub mod parameters;
pub mod plan;
pub mod poly;
pub mod poly_path;
pub mod position;
pub mod projection;
pub mod registry;
pub mod rules;
pub mod sequencer;
pub mod units;
pub mod urgency;
pub mod util;
pub mod vect;

pub use conflict_list::{merge, ConflictInterval, ConflictList, ConflictReport};
pub use detection::{
    CdCylinder, CdPolyIter, CdssCore, ConflictData, Detection3D, DetectionPolygon, LossData,
};
pub use error::{GeometryError, ParameterError};
pub use error_log::{ErrorLog, ErrorReporter};
pub use moving_polygon::{MovingPolygon2D, MovingPolygon3D};
pub use parameters::ParameterData;
pub use plan::{NavPoint, Plan};
pub use poly::{Poly2D, Poly3D};
pub use poly_path::{PathMode, PolyPath, SimplePoly};
pub use position::{LatLonAlt, Position};
pub use projection::EuclideanProjection;
pub use registry::{
    detection3d_from_parameters, detection_polygon_from_parameters, load_detectors,
    load_detectors_json, DetectorSet,
};
pub use rules::SeparationRules;
pub use sequencer::{Cdii, CdiiPolygon, Cdsi, CdsiPolygon};
pub use urgency::{TargetUrgency, TrafficState};
pub use vect::{Vect2, Vect3, Velocity};
