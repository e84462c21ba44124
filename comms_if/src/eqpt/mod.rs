//! # Equipment Interface
//!
//! This module defines the interface structures exchanged with the equipment around the flight
//! executive: the state estimator (or motion capture), the path planner, and the vehicle link.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod act;
pub mod est;
pub mod hex;
pub mod plan;
pub mod reloc;

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

/// Envelope for every message arriving on the input subscriber socket.
///
/// Serialised as externally tagged JSON, e.g. `{"Hex": {"batt_voltage_v": 14.2}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InputMsg {
    /// State from the onboard estimator, expressed in the current reference node.
    Estimate(est::Estimate),

    /// State from motion capture, expressed in the fixed capture frame.
    Truth(est::Estimate),

    /// New plan from the path planner.
    Plan(plan::Plan),

    /// Transform between the previous and current reference nodes.
    Edge(reloc::RelocEdge),

    /// Global position of the current reference node.
    NodeGlobal(reloc::NodeGlobalPose),

    /// Vehicle status from the flight controller debug stream.
    Hex(hex::HexStatus),
}

impl InputMsg {
    /// Parse a message from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_input_msg() {
        match InputMsg::from_json(r#"{"Hex": {"batt_voltage_v": 14.2}}"#).unwrap() {
            InputMsg::Hex(h) => assert_eq!(h.batt_voltage_v, 14.2),
            m => panic!("Expected a Hex message, got {:?}", m),
        }

        let edge = InputMsg::from_json(
            r#"{"Edge": {
                "from_node_id": 3,
                "to_node_id": 4,
                "translation_m": [1.0, 0.5, 0.0],
                "yaw_rad": 0.1
            }}"#,
        )
        .unwrap();
        match edge {
            InputMsg::Edge(e) => {
                assert_eq!(e.from_node_id, 3);
                assert_eq!(e.to_node_id, 4);
            }
            m => panic!("Expected an Edge message, got {:?}", m),
        }

        assert!(InputMsg::from_json(r#"{"Unknown": {}}"#).is_err());
    }
}
