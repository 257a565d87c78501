//! Bucket and object operations through the S3-compatible gateway.
//!
//! The gateway answers 500 for every failure, so negative cases also check
//! that the body carries an error description.

use std::sync::Arc;

use testing_framework_core::{
    harness::{CaseResult, Halt, SystemTest},
    zs3::{self, Zs3Client, Zs3Response},
};

use super::util::unique_suffix;
use crate::Network;

const FAILURE_STATUS: u16 = 500;

pub fn zs3_tests(t: &SystemTest, network: Arc<Network>) {
    t.mark_smoke(["bucket_lifecycle"]);

    let shared = Arc::clone(&network);
    t.run_parallel("bucket_lifecycle", move |t| bucket_lifecycle(t, shared));
    let shared = Arc::clone(&network);
    t.run_parallel("missing_parameters", move |t| missing_parameters(t, shared));
    t.run_parallel("unknown_bucket", move |t| unknown_bucket(t, network));
}

fn gateway<'a>(t: &SystemTest, network: &'a Network) -> Result<&'a Zs3Client, Halt> {
    network
        .zs3
        .as_ref()
        .ok_or_else(|| t.skip("no zs3 gateway configured"))
}

fn require_success(t: &SystemTest, response: &Zs3Response, what: &str) -> CaseResult {
    t.require(
        response.is_success(),
        format!("{what}: gateway answered {}: {}", response.status, response.body),
    )
}

fn check_failure(t: &SystemTest, response: &Zs3Response, what: &str) {
    t.check_eq(response.status.as_u16(), FAILURE_STATUS, what);
    t.check(
        !response.body.trim().is_empty(),
        format!("{what}: failure without an error body"),
    );
}

async fn bucket_lifecycle(t: SystemTest, network: Arc<Network>) -> CaseResult {
    let client = gateway(&t, &network)?;
    let bucket = format!("system-test-{}", unique_suffix());
    let object = "hello.txt";

    let created = client.create_bucket(&bucket).await?;
    require_success(&t, &created, "create bucket")?;

    let buckets = client.list_buckets().await?;
    require_success(&t, &buckets, "list buckets")?;
    t.check(
        buckets.body.contains(&bucket),
        format!("bucket {bucket} missing from {}", buckets.body),
    );

    let put = client
        .put_object(&bucket, object, b"hello from the system tests".as_slice())
        .await?;
    require_success(&t, &put, "put object")?;

    let objects = client.list_objects(&bucket).await?;
    require_success(&t, &objects, "list objects")?;
    t.check(
        objects.body.contains(object),
        format!("object {object} missing from {}", objects.body),
    );

    let removed = client.remove_object(&bucket, object).await?;
    require_success(&t, &removed, "remove object")?;

    let objects = client.list_objects(&bucket).await?;
    require_success(&t, &objects, "list objects after remove")?;
    t.require(
        !objects.body.contains(object),
        format!("object {object} still listed: {}", objects.body),
    )
}

async fn missing_parameters(t: SystemTest, network: Arc<Network>) -> CaseResult {
    let client = gateway(&t, &network)?;

    for action in [zs3::CREATE_BUCKET, zs3::LIST_OBJECTS, zs3::REMOVE_OBJECT] {
        let response = client.call(action, &[]).await?;
        check_failure(&t, &response, &format!("{action} without parameters"));
    }
    Ok(())
}

async fn unknown_bucket(t: SystemTest, network: Arc<Network>) -> CaseResult {
    let client = gateway(&t, &network)?;
    let bucket = format!("missing-{}", unique_suffix());

    let response = client.list_objects(&bucket).await?;
    check_failure(&t, &response, "list objects of an unknown bucket");
    let response = client.remove_object(&bucket, "nothing.txt").await?;
    check_failure(&t, &response, "remove object from an unknown bucket");
    Ok(())
}
