use hermes::config::endpoints::{receiver_endpoints, sender_endpoints};
use hermes::config::{ConfigSource, Overrides, Settings};
use hermes::domain::HttpMethod;
use hermes::schema::{ExtraFields, Fallback};
use std::fs;
use tempfile::TempDir;

const OPENAPI: &str = r#"
openapi: 3.0.0
info:
  title: Orders
  version: 1.0.0
paths:
  /orders/{orderId}:
    get:
      summary: Fetch order
    put:
      summary: Replace order
      requestBody:
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/Order'
components:
  schemas:
    Order:
      type: object
      required: [id]
      properties:
        id:
          type: string
        lines:
          type: array
          items:
            $ref: '#/components/schemas/Line'
    Line:
      type: object
      properties:
        sku:
          type: string
        quantity:
          type: integer
          minimum: 1
"#;

#[test]
fn test_load_full_layout() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    fs::create_dir_all(root.join("config/receiver"))?;
    fs::create_dir_all(root.join("config/sender"))?;
    fs::create_dir_all(root.join("specs"))?;

    let hermes_toml = r#"
[receiver]
port = 8100
openapi = "specs/orders.yaml"
extra_fields = "keep"

[sender]
target_port = 8100
timeout_seconds = 3

[engine]
on_invalid_pattern = "fail"
"#;
    fs::write(root.join("hermes.toml"), hermes_toml)?;
    fs::write(root.join("specs/orders.yaml"), OPENAPI)?;

    // Flat field list with a nested object and an array of objects
    let receiver_json = r#"
{
    "url": "/customers",
    "method": "POST",
    "description": "Create customer",
    "bodyFields": [
        { "name": "name", "dataType": "string", "required": true },
        { "name": "address", "dataType": "object" },
        { "name": "city", "dataType": "string", "parentProperty": "address" },
        { "name": "contacts", "dataType": "array" },
        { "name": "contact", "dataType": "object", "parentProperty": "contacts" },
        { "name": "phone", "dataType": "string", "parentProperty": "contact" }
    ]
}
"#;
    fs::write(root.join("config/receiver/customers.json"), receiver_json)?;

    let sender_yaml = r#"
url: /events
method: post
bodyFields:
  - name: level
    dataType: integer
    minValue: 1
    maxValue: 5
"#;
    fs::write(root.join("config/sender/events.yaml"), sender_yaml)?;

    let settings = Settings::load(&root.join("hermes.toml"), &Overrides::default())?;
    assert_eq!(settings.receiver.port, 8100);
    assert_eq!(settings.receiver.extra_fields, ExtraFields::Keep);
    assert_eq!(settings.sender.timeout_seconds, 3);
    assert_eq!(settings.engine.on_invalid_pattern, Fallback::Fail);
    assert_eq!(settings.engine.on_cycle, Fallback::Degrade);

    let receiver = receiver_endpoints(&settings)?;
    assert_eq!(receiver.len(), 3);
    assert_eq!(receiver[0].url, "/customers");
    let body = receiver[0].body.as_ref().unwrap();
    assert!(body.property("address").unwrap().property("city").is_some());
    let contact = body.property("contacts").unwrap().items().unwrap();
    assert!(contact.property("phone").is_some());

    assert_eq!(receiver[1].method, HttpMethod::Get);
    assert!(receiver[1].body.is_none());
    assert_eq!(receiver[2].url, "/orders/{orderId}");
    let order = receiver[2].body.as_ref().unwrap();
    assert_eq!(order.name.as_deref(), Some("Order"));
    assert!(order.property("lines").unwrap().items().unwrap().property("sku").is_some());

    let sender = sender_endpoints(&settings)?;
    assert_eq!(sender.len(), 1);
    assert_eq!(sender[0].method, HttpMethod::Post);
    Ok(())
}

#[test]
fn test_missing_openapi_document_fails() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    fs::write(
        temp_dir.path().join("hermes.toml"),
        "[receiver]\nopenapi = \"missing.yaml\"\n",
    )?;

    let settings = Settings::from_root(temp_dir.path())?;
    assert!(receiver_endpoints(&settings).is_err());
    Ok(())
}

#[test]
fn test_source_watch_paths() {
    let source = ConfigSource::new("/etc/hermes/hermes.toml");
    let paths = source.watch_paths();
    assert_eq!(paths.len(), 3);
    assert!(paths[1].ends_with("config/receiver"));
    assert!(paths[2].ends_with("config/sender"));
}
