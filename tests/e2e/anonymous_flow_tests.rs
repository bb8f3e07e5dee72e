use anyhow::Result;
use assert_matches::assert_matches;
use chrono::Duration;
use std::sync::Arc;
use tvm_auth::{
    packaging::unpackage, signature::sign_timestamp, DeviceRegistry, TokenRequest, TvmError,
};
use tvm_tests::{flip_bit, local_service, setup_test_logging, test_now};

const DEVICE: &str = "device-1";
const KEY: &str = "secretABC";
const TIMESTAMP: &str = "2024-01-01T00:00:00Z";

#[tokio::test]
async fn register_validate_issue_scenario() -> Result<()> {
    setup_test_logging();
    let (_registry, service) = local_service();

    // Registered
    service.register_device(DEVICE, KEY).await?;

    // Valid, followed by a payload only the device can open
    let signature = sign_timestamp(KEY, TIMESTAMP);
    service
        .validate_token_request(DEVICE, &signature, TIMESTAMP)
        .await?;
    let payload = service.issue_token(DEVICE).await?;
    let credentials = unpackage(&payload, KEY)?;
    assert_eq!(credentials.access_key_id, payload.access_key_id);
    assert!(unpackage(&payload, "secretABD").is_err());

    // Stale: window + 1s on either side
    let window = Duration::minutes(15) + Duration::seconds(1);
    for shifted in [test_now() - window, test_now() + window] {
        let timestamp = shifted.to_rfc3339();
        let signature = sign_timestamp(KEY, &timestamp);
        assert_matches!(
            service
                .validate_token_request(DEVICE, &signature, &timestamp)
                .await,
            Err(TvmError::Stale)
        );
    }

    // Unauthorized: one flipped bit
    let tampered = flip_bit(&signature, 0, 0);
    assert_ne!(tampered, signature);
    assert_matches!(
        service
            .validate_token_request(DEVICE, &tampered, TIMESTAMP)
            .await,
        Err(TvmError::Unauthorized)
    );

    Ok(())
}

#[tokio::test]
async fn window_edges_are_accepted() -> Result<()> {
    let (_registry, service) = local_service();
    service.register_device(DEVICE, KEY).await?;

    let window = Duration::minutes(15);
    for edge in [test_now() - window, test_now() + window] {
        let timestamp = edge.to_rfc3339();
        let request = TokenRequest::new(DEVICE, &timestamp, sign_timestamp(KEY, &timestamp));
        let payload = service.request_token(&request).await?;
        assert!(!payload.ciphertext.is_empty());
    }

    Ok(())
}

#[tokio::test]
async fn bit_flips_anywhere_are_rejected() -> Result<()> {
    let (_registry, service) = local_service();
    service.register_device(DEVICE, KEY).await?;
    let signature = sign_timestamp(KEY, TIMESTAMP);

    for byte in [0, 7, 16, 31] {
        for bit in [0, 3, 7] {
            let request = TokenRequest::new(DEVICE, TIMESTAMP, flip_bit(&signature, byte, bit));
            assert_matches!(
                service.request_token(&request).await,
                Err(TvmError::Unauthorized)
            );
        }
    }

    Ok(())
}

#[tokio::test]
async fn conflicting_registration_keeps_first_key() -> Result<()> {
    let (registry, service) = local_service();

    service.register_device(DEVICE, "key1").await?;
    assert_matches!(
        service.register_device(DEVICE, "key2").await,
        Err(TvmError::Conflict)
    );
    assert_eq!(registry.lookup_key(DEVICE).await?, Some("key1".to_string()));

    // The second key never authenticates
    let request = TokenRequest::new(DEVICE, TIMESTAMP, sign_timestamp("key2", TIMESTAMP));
    assert_matches!(
        service.request_token(&request).await,
        Err(TvmError::Unauthorized)
    );

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registration_has_one_winner() -> Result<()> {
    let (registry, service) = local_service();
    let service = Arc::new(service);

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .register_device("race-device", &format!("key-{}", i))
                    .await
            })
        })
        .collect();

    let mut registered = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await? {
            Ok(()) => registered += 1,
            Err(TvmError::Conflict) => conflicts += 1,
            Err(other) => panic!("unexpected outcome: {}", other),
        }
    }

    assert_eq!(registered, 1);
    assert_eq!(conflicts, 15);
    assert_eq!(registry.len().await, 1);

    Ok(())
}

#[tokio::test]
async fn unknown_device_never_validates() -> Result<()> {
    let (_registry, service) = local_service();
    let genuine = sign_timestamp(KEY, TIMESTAMP);

    for signature in ["", "AAAA", genuine.as_str()] {
        assert_matches!(
            service
                .validate_token_request("ghost-device", signature, TIMESTAMP)
                .await,
            Err(TvmError::Unauthorized)
        );
    }

    Ok(())
}
