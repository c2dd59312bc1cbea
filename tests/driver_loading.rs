//! Sandboxed driver loading over real HTTP, against a mock extensions
//! origin: URL convention, export normalization, caching, and typed
//! load failures.

use serde_json::json;
use sourceplane::domain::{DriverRuntime, ExtensionManifest};
use sourceplane::extensions::{DriverExport, DriverResolver, ExtensionRegistry, HttpDriverLoader};
use sourceplane::DriverHandle;
use std::sync::Arc;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sandboxed_manifest(entry: Option<&str>) -> ExtensionManifest {
    let mut driver = json!({ "id": "snowflake.sandboxed", "name": "Sandboxed", "runtime": "browser" });
    if let Some(entry) = entry {
        driver["entry"] = json!(entry);
    }
    serde_json::from_value(json!({
        "id": "snowflake",
        "name": "Snowflake",
        "scope": "DATASOURCE",
        "schema": { "type": "object", "properties": {} },
        "drivers": [driver]
    }))
    .unwrap()
}

fn resolver_against(server_uri: &str, manifest: ExtensionManifest) -> DriverResolver {
    let registry = Arc::new(ExtensionRegistry::new());
    registry.register(manifest).unwrap();
    DriverResolver::new(
        registry,
        Arc::new(HttpDriverLoader::new()),
        Url::parse(server_uri).unwrap(),
    )
}

#[tokio::test]
async fn bundle_is_fetched_once_from_the_convention_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/extensions/snowflake/driver.js"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("export function createDriver(config) { return config; }"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let resolver = resolver_against(&server.uri(), sandboxed_manifest(None));

    // Repeated resolutions share the one fetched module.
    for _ in 0..3 {
        let handle = resolver
            .resolve("snowflake", "snowflake.sandboxed", DriverRuntime::Browser)
            .await
            .unwrap();
        match handle {
            DriverHandle::Sandboxed(module) => {
                assert_eq!(module.export(), DriverExport::Factory);
                assert!(module.source_url().as_str().ends_with("/extensions/snowflake/driver.js"));
            }
            DriverHandle::Host { .. } => panic!("browser drivers are sandboxed"),
        }
    }

    server.verify().await;
}

#[tokio::test]
async fn explicit_entry_overrides_the_default_filename() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/extensions/snowflake/sf-driver.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string("export default factory;"))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = resolver_against(&server.uri(), sandboxed_manifest(Some("sf-driver.js")));
    let handle = resolver
        .resolve("snowflake", "snowflake.sandboxed", DriverRuntime::Browser)
        .await
        .unwrap();

    match handle {
        DriverHandle::Sandboxed(module) => assert_eq!(module.export(), DriverExport::Default),
        DriverHandle::Host { .. } => panic!("expected a sandboxed handle"),
    }
    server.verify().await;
}

#[tokio::test]
async fn http_failure_surfaces_as_driver_load_with_the_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/extensions/snowflake/driver.js"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let resolver = resolver_against(&server.uri(), sandboxed_manifest(None));
    let err = resolver
        .resolve("snowflake", "snowflake.sandboxed", DriverRuntime::Browser)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "driver_load");
    assert!(err.to_string().contains("/extensions/snowflake/driver.js"));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn bundle_without_a_factory_surface_fails_to_normalize() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/extensions/snowflake/driver.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string("const helper = 1;"))
        .mount(&server)
        .await;

    let resolver = resolver_against(&server.uri(), sandboxed_manifest(None));
    let err = resolver
        .resolve("snowflake", "snowflake.sandboxed", DriverRuntime::Browser)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "driver_load");
    assert!(err.to_string().contains("neither"));
}
