use std::sync::Arc;

use protodoc::prelude::*;

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

fn address() -> Result<Arc<MessageDescriptor>, ProtodocError> {
    Ok(MessageDescriptor::builder("demo.Address")
        .field(1, "street", FieldKind::Scalar(ScalarKind::String))
        .field(2, "city", FieldKind::Scalar(ScalarKind::String))
        .build()?)
}

fn account() -> Result<Arc<MessageDescriptor>, ProtodocError> {
    Ok(MessageDescriptor::builder("demo.Account")
        .field(1, "name", FieldKind::Scalar(ScalarKind::String))
        .field(2, "plan", FieldKind::Enum)
        .field(3, "email", FieldKind::Scalar(ScalarKind::String))
        .field(4, "phone", FieldKind::Scalar(ScalarKind::String))
        .field(5, "address", FieldKind::Message(address()?))
        .field(
            6,
            "projects",
            FieldKind::Map {
                key: ScalarKind::String,
                value: ElementType::Scalar(ScalarKind::Bool),
            },
        )
        .field(
            7,
            "scores",
            FieldKind::Map {
                key: ScalarKind::Uint32,
                value: ElementType::Scalar(ScalarKind::Double),
            },
        )
        .field(8, "tags", FieldKind::List(ElementType::Scalar(ScalarKind::String)))
        .field(9, "created", FieldKind::Message(well_known::timestamp_descriptor()))
        .oneof("contact", [3, 4])
        .build()?)
}

fn sample(descriptor: &Arc<MessageDescriptor>) -> Result<DynamicMessage, ProtodocError> {
    let mut home = DynamicMessage::new(address()?);
    home.set_by_name("street", "1 Main St")?;
    home.set_by_name("city", "Springfield")?;

    let mut projects = MapValue::new(ScalarKind::String, ElementType::Scalar(ScalarKind::Bool));
    projects.set("abd", Value::from(false));
    projects.set("def", Value::from(true));

    let mut scores = MapValue::new(ScalarKind::Uint32, ElementType::Scalar(ScalarKind::Double));
    scores.set(2024u32, Value::from(91.5));
    scores.set(2025u32, Value::from(97.0));

    let mut message = DynamicMessage::new(Arc::clone(descriptor));
    message.set_by_name("name", "ada")?;
    message.set_by_name("plan", Value::Enum(2))?;
    message.set_by_name("email", "ada@example.com")?;
    message.set_by_name("address", home)?;
    message.set_by_name("projects", projects)?;
    message.set_by_name("scores", scores)?;
    message.set_by_name(
        "tags",
        ListValue::from_values(
            ElementType::Scalar(ScalarKind::String),
            ["admin", "beta"].map(Value::from),
        ),
    )?;
    message.set_by_name(
        "created",
        well_known::timestamp_from_system_time(std::time::SystemTime::now()),
    )?;
    Ok(message)
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<(), ProtodocError> {
    protodoc::logging::init_from_env();

    let codec = DocumentCodec::from_env();
    tracing::info!(config = %serde_json::to_string(codec.config())?, "configuration");

    let descriptor = account()?;
    let message = sample(&descriptor)?;

    let bytes = codec.encode_document(&message)?;
    tracing::info!(len = bytes.len(), "encoded account");

    let mut decoded = DynamicMessage::new(descriptor);
    codec.decode_document(&bytes, &mut decoded)?;
    tracing::info!(fields = decoded.len(), equal = (decoded == message), "decoded account");

    println!("{decoded:#?}");
    Ok(())
}
