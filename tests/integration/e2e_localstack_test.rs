// End-to-end integration tests with LocalStack
// Real S3 reads through the pipeline using testcontainers

use image::{DynamicImage, ImageFormat, RgbImage};
use shutterline::config::ServiceConfig;
use shutterline::pipeline::{ImageRequest, Pipeline};
use shutterline::storage::{ObjectStore, S3ObjectStore, StorageError};
use std::io::Cursor;
use std::sync::{Arc, Once};
use testcontainers::{clients::Cli, RunnableImage};
use testcontainers_modules::localstack::LocalStack;

static INIT: Once = Once::new();

const BUCKET: &str = "originals";

fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("shutterline=debug")
            .try_init();
    });
}

fn create_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| image::Rgb([(x % 255) as u8, (y % 255) as u8, 40]));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .unwrap();
    buffer.into_inner()
}

async fn s3_client(endpoint: &str) -> aws_sdk_s3::Client {
    let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .endpoint_url(endpoint)
        .region(aws_config::Region::new("us-east-1"))
        .credentials_provider(aws_credential_types::Credentials::new(
            "test", "test", None, None, "test",
        ))
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&config)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}

async fn seed_bucket(client: &aws_sdk_s3::Client) {
    client
        .create_bucket()
        .bucket(BUCKET)
        .send()
        .await
        .expect("Failed to create bucket");

    client
        .put_object()
        .bucket(BUCKET)
        .key("photos/cat.jpg")
        .content_type("image/jpeg")
        .body(create_test_jpeg(400, 300).into())
        .send()
        .await
        .expect("Failed to upload test image");
}

#[test]
#[ignore] // Requires Docker - run with: cargo test --test integration_tests -- --ignored
fn test_pipeline_transforms_object_from_localstack() {
    init_logging();

    let docker = Cli::default();
    let localstack_image =
        RunnableImage::from(LocalStack::default()).with_env_var(("SERVICES", "s3"));
    let container = docker.run(localstack_image);
    let port = container.get_host_port_ipv4(4566);
    let endpoint = format!("http://127.0.0.1:{}", port);

    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let client = s3_client(&endpoint).await;
        seed_bucket(&client).await;

        let store = S3ObjectStore::new(client, BUCKET);
        let pipeline = Pipeline::new(Arc::new(store), ServiceConfig::new(BUCKET));

        let response = pipeline
            .handle(
                &ImageRequest::new("/photos/cat.jpg", "w=200&h=200&fit=crop&auto=format")
                    .with_accept("image/webp"),
            )
            .await;

        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "image/webp");
        assert_eq!(response.header("Vary"), Some("Accept"));
        let output = image::load_from_memory(&response.body).unwrap();
        assert_eq!((output.width(), output.height()), (200, 200));
    });
}

#[test]
#[ignore] // Requires Docker - run with: cargo test --test integration_tests -- --ignored
fn test_missing_key_maps_to_not_found() {
    init_logging();

    let docker = Cli::default();
    let localstack_image =
        RunnableImage::from(LocalStack::default()).with_env_var(("SERVICES", "s3"));
    let container = docker.run(localstack_image);
    let port = container.get_host_port_ipv4(4566);
    let endpoint = format!("http://127.0.0.1:{}", port);

    tokio_test::block_on(async {
        let client = s3_client(&endpoint).await;
        seed_bucket(&client).await;

        let store = S3ObjectStore::new(client, BUCKET);
        let err = store.get("photos/missing.jpg").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
        assert_eq!(err.to_http_status(), 404);

        let object = store.get("photos/cat.jpg").await.unwrap();
        assert_eq!(object.content_type.as_deref(), Some("image/jpeg"));
        assert!(object.content_length > 0);
    });
}
