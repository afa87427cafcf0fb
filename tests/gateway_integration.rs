// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the REST gateway accessor using wiremock.

#![cfg(feature = "gateway")]

use std::time::Duration;

use serde_json::json;
use statewatch::error::{DeviceError, Error, ProtocolError};
use statewatch::monitor::{WaitBudget, watch};
use statewatch::resource::{
    AttributeReader, CommandInvoker, GatewayClient, GatewayConfig, ResourceProvider,
};
use statewatch::types::{AttrValue, DeviceName};
use wiremock::matchers::{body_partial_json, method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn subarray() -> DeviceName {
    DeviceName::new("ska_mid/tm_subarray_node/1").unwrap()
}

fn client_for(server: &MockServer) -> GatewayClient {
    GatewayConfig::new(server.uri())
        .with_timeout(Duration::from_secs(2))
        .into_client()
}

mod attribute_reads {
    use super::*;

    #[tokio::test]
    async fn read_state_attribute() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"/devices/.+/attributes/obsState/value$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "obsState",
                "value": "IDLE",
                "quality": "ATTR_VALID",
            })))
            .mount(&server)
            .await;

        let handle = client_for(&server).resource(&subarray());
        let value = handle.read("obsState").await.unwrap();
        assert_eq!(value, AttrValue::from("IDLE"));
    }

    #[tokio::test]
    async fn read_array_attribute_normalizes_to_tuple() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"/attributes/receptorIDList/value$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "receptorIDList",
                "value": [1, 2, 3, 4],
            })))
            .mount(&server)
            .await;

        let handle = client_for(&server).resource(&subarray());
        let value = handle.read("receptorIDList").await.unwrap();
        assert_eq!(value, AttrValue::from(vec![1_i64, 2, 3, 4]));
    }

    #[tokio::test]
    async fn missing_attribute_reads_as_sentinel() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let handle = client_for(&server).resource(&subarray());
        let value = handle.read("nonexistent").await.unwrap();
        assert!(value.is_not_found());
    }

    #[tokio::test]
    async fn server_error_is_a_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let handle = client_for(&server).resource(&subarray());
        let result = handle.read("obsState").await;
        assert!(matches!(
            result,
            Err(Error::Protocol(ProtocolError::UnexpectedStatus { status: 500 }))
        ));
    }

    #[tokio::test]
    async fn null_value_reads_as_sentinel() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "obsState",
                "value": null,
            })))
            .mount(&server)
            .await;

        let handle = client_for(&server).resource(&subarray());
        assert!(handle.read("obsState").await.unwrap().is_not_found());
    }
}

mod commands {
    use super::*;

    #[tokio::test]
    async fn invoke_sends_the_argument_payload() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(r"/commands/AssignResources$"))
            .and(body_partial_json(json!({"input": {"subarrayID": 1}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "output": ["0001", "0002"],
            })))
            .mount(&server)
            .await;

        let handle = client_for(&server).resource(&subarray());
        let output = handle
            .invoke("AssignResources", Some(json!({"subarrayID": 1})))
            .await
            .unwrap();
        assert_eq!(output, json!(["0001", "0002"]));
    }

    #[tokio::test]
    async fn invoke_without_output_returns_null() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let handle = client_for(&server).resource(&subarray());
        let output = handle.invoke("StartUpTelescope", None).await.unwrap();
        assert_eq!(output, serde_json::Value::Null);
    }

    #[tokio::test]
    async fn rejected_command_is_a_device_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let handle = client_for(&server).resource(&subarray());
        let result = handle.invoke("Scan", Some(json!({"id": 1}))).await;
        assert!(matches!(
            result,
            Err(Error::Device(DeviceError::CommandRejected(_)))
        ));
    }
}

mod monitoring {
    use super::*;

    #[tokio::test]
    async fn monitor_observes_a_gateway_transition() {
        let server = MockServer::start().await;
        // The first two reads (baseline + first poll) see IDLE, later
        // reads see READY.
        Mock::given(method("GET"))
            .and(path_regex(r"/attributes/obsState/value$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "obsState",
                "value": "IDLE",
            })))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"/attributes/obsState/value$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "obsState",
                "value": "READY",
            })))
            .mount(&server)
            .await;

        let handle = client_for(&server).resource(&subarray());
        let mut monitor = watch(handle)
            .for_a_change_to("obsState", "READY")
            .await
            .unwrap();
        assert_eq!(monitor.baseline(), &AttrValue::from("IDLE"));

        let budget = WaitBudget::new(Duration::from_secs(5))
            .with_resolution(Duration::from_millis(20));
        let value = monitor.value_when_changed(budget).await.unwrap();
        assert_eq!(value, AttrValue::from("READY"));
    }
}
