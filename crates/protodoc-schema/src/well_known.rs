//! Well-known message types with a special native representation.
//!
//! Only `google.protobuf.Timestamp` is recognised: `seconds` (int64,
//! number 1) at position 0 and `nanos` (int32, number 2) at position 1.

use std::sync::{Arc, OnceLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::{DynamicMessage, FieldKind, MessageDescriptor, ScalarKind, ScalarValue, Value};

/// Full name of the well-known timestamp type.
pub const TIMESTAMP_FULL_NAME: &str = "google.protobuf.Timestamp";

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// The shared descriptor of `google.protobuf.Timestamp`.
pub fn timestamp_descriptor() -> Arc<MessageDescriptor> {
    static DESCRIPTOR: OnceLock<Arc<MessageDescriptor>> = OnceLock::new();
    let descriptor = DESCRIPTOR.get_or_init(|| {
        let fields = [
            (1, "seconds", ScalarKind::Int64),
            (2, "nanos", ScalarKind::Int32),
        ];
        let builder = fields
            .into_iter()
            .fold(MessageDescriptor::builder(TIMESTAMP_FULL_NAME), |b, (n, name, kind)| {
                b.field(n, name, FieldKind::Scalar(kind))
            });
        match builder.build() {
            Ok(descriptor) => descriptor,
            Err(e) => unreachable!("timestamp descriptor is statically valid: {e}"),
        }
    });
    Arc::clone(descriptor)
}

/// Builds a timestamp message. Zero sub-fields are left unset.
pub fn timestamp(seconds: i64, nanos: i32) -> DynamicMessage {
    let descriptor = timestamp_descriptor();
    let mut message = DynamicMessage::new(Arc::clone(&descriptor));
    let values = [Value::from(seconds), Value::from(nanos)];
    for (field, value) in descriptor.fields().iter().zip(values) {
        if field.kind().zero_value() == value {
            continue;
        }
        if let Err(e) = message.set(field, value) {
            unreachable!("timestamp parts match their declared kinds: {e}");
        }
    }
    message
}

/// Reads `(seconds, nanos)` out of a timestamp message.
///
/// Unset sub-fields read as zero. Returns `None` if `message` isn't a
/// timestamp.
pub fn timestamp_parts(message: &DynamicMessage) -> Option<(i64, i32)> {
    let descriptor = message.descriptor();
    if descriptor.full_name() != TIMESTAMP_FULL_NAME {
        return None;
    }
    let seconds = match message.get(descriptor.field_at(0)?) {
        Some(Value::Scalar(ScalarValue::Int64(s))) => *s,
        _ => 0,
    };
    let nanos = match message.get(descriptor.field_at(1)?) {
        Some(Value::Scalar(ScalarValue::Int32(n))) => *n,
        _ => 0,
    };
    Some((seconds, nanos))
}

/// Converts a [`SystemTime`] into a timestamp message.
///
/// Times before the epoch keep `nanos` non-negative, with `seconds`
/// rounded toward negative infinity.
pub fn timestamp_from_system_time(time: SystemTime) -> DynamicMessage {
    let (seconds, nanos) = match time.duration_since(UNIX_EPOCH) {
        Ok(after) => (after.as_secs() as i64, after.subsec_nanos() as i32),
        Err(e) => {
            let before = e.duration();
            let mut seconds = -(before.as_secs() as i64);
            let mut nanos = before.subsec_nanos() as i64;
            if nanos > 0 {
                seconds -= 1;
                nanos = NANOS_PER_SECOND - nanos;
            }
            (seconds, nanos as i32)
        }
    };
    timestamp(seconds, nanos)
}

/// Converts a timestamp message into a [`SystemTime`].
///
/// Returns `None` for messages of another type or out-of-range nanos.
pub fn to_system_time(message: &DynamicMessage) -> Option<SystemTime> {
    let (seconds, nanos) = timestamp_parts(message)?;
    if !(0..NANOS_PER_SECOND as i32).contains(&nanos) {
        return None;
    }
    let nanos = Duration::from_nanos(nanos as u64);
    if seconds >= 0 {
        UNIX_EPOCH
            .checked_add(Duration::from_secs(seconds as u64))?
            .checked_add(nanos)
    } else {
        UNIX_EPOCH
            .checked_sub(Duration::from_secs(seconds.unsigned_abs()))?
            .checked_add(nanos)
    }
}
