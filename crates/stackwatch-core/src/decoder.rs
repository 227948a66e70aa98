//! Frame decoding.

use crate::error::DecodeError;
use crate::event::Event;

/// Decode one frame into an [`Event`].
///
/// Missing envelope fields decode as empty values; anything that is not a
/// JSON object of the expected shape is a [`DecodeError::Frame`].
pub fn decode_frame(frame: &[u8]) -> Result<Event, DecodeError> {
    serde_json::from_slice(frame).map_err(DecodeError::Frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_resource_change() {
        let frame = br#"{
            "name": "resource.change",
            "resourceType": "container",
            "resourceId": "1i42",
            "data": {"resource": {"id": "1i42", "name": "web-1", "state": "running"}}
        }"#;
        let event = decode_frame(frame).unwrap();
        assert_eq!(event.name, "resource.change");
        assert_eq!(event.resource_type, "container");
        assert_eq!(event.resource_id, "1i42");
        assert_eq!(event.resource().unwrap()["state"], "running");
    }

    #[test]
    fn ping_without_resource_still_decodes() {
        let event = decode_frame(br#"{"name":"ping"}"#).unwrap();
        assert_eq!(event.name, "ping");
        assert!(event.resource_type.is_empty());
        assert!(event.data.is_empty());
    }

    #[test]
    fn null_data_decodes_as_empty() {
        let event = decode_frame(br#"{"name":"ping","data":null}"#).unwrap();
        assert!(event.data.is_empty());
    }

    #[test]
    fn garbage_is_a_frame_error() {
        assert!(matches!(decode_frame(b"not json"), Err(DecodeError::Frame(_))));
        assert!(matches!(decode_frame(b"[1,2,3]"), Err(DecodeError::Frame(_))));
        assert!(matches!(
            decode_frame(br#"{"name": 7}"#),
            Err(DecodeError::Frame(_))
        ));
    }
}
