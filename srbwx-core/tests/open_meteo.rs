//! HTTP-level tests for the Open-Meteo source and the orchestrator on top of it.

use std::{sync::Arc, time::Duration};

use srbwx_core::{
    AirQualitySnapshot, CANDIDATE_CITIES, FetchError, FetchStatus, ForecastOrchestrator, Lang,
    OpenMeteoSource, Preferences, SourceError, WeatherSource,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

fn forecast_body() -> serde_json::Value {
    serde_json::json!({
        "latitude": 44.79,
        "longitude": 20.45,
        "utc_offset_seconds": 3600,
        "timezone": "Europe/Belgrade",
        "current": {
            "time": "2025-01-15T12:00",
            "temperature_2m": 4.2,
            "apparent_temperature": 1.0,
            "relative_humidity_2m": 76,
            "wind_speed_10m": 18.4,
            "surface_pressure": 1001.6,
            "is_day": 1
        },
        "hourly": {
            "time": ["2025-01-15T00:00", "2025-01-15T01:00"],
            "temperature_2m": [1.0, 0.5]
        },
        "daily": {
            "time": ["2025-01-15", "2025-01-16", "2025-01-17"],
            "temperature_2m_max": [5.0, 6.0, 7.0],
            "temperature_2m_min": [-2.0, 1.0, 2.0],
            "precipitation_sum": [0.0, 18.2, 0.0],
            "weathercode": [3, 63, 95],
            "wind_speed_10m_max": [20.0, 30.0, 64.0]
        }
    })
}

fn air_body() -> serde_json::Value {
    serde_json::json!({
        "utc_offset_seconds": 3600,
        "hourly": {
            "time": ["2000-01-01T00:00", "2000-01-01T01:00"],
            "pm10": [40.0, 41.5],
            "pm2_5": [25.0, 26.5]
        }
    })
}

fn source_for(server: &MockServer, timeout: Duration) -> OpenMeteoSource {
    OpenMeteoSource::new(
        format!("{}/v1/forecast", server.uri()),
        format!("{}/v1/air-quality", server.uri()),
        "Europe/Belgrade",
        timeout,
    )
    .expect("client builds")
}

fn ok_json(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

async fn mount_forecast(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(template)
        .mount(server)
        .await;
}

async fn mount_air(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/v1/air-quality"))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn forecast_request_carries_expected_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "44.7866"))
        .and(query_param("longitude", "20.4489"))
        .and(query_param("timezone", "Europe/Belgrade"))
        .and(query_param(
            "current",
            concat!(
                "temperature_2m,apparent_temperature,relative_humidity_2m,",
                "wind_speed_10m,surface_pressure,is_day"
            ),
        ))
        .and(query_param("hourly", "temperature_2m"))
        .and(query_param(
            "daily",
            concat!(
                "temperature_2m_max,temperature_2m_min,precipitation_sum,",
                "weathercode,wind_speed_10m_max"
            ),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
        .expect(1)
        .mount(&server)
        .await;

    let source = source_for(&server, Duration::from_secs(5));
    let snap = source
        .forecast(&CANDIDATE_CITIES[0])
        .await
        .expect("forecast parses");

    assert_eq!(snap.current.temp, 4.2);
    assert_eq!(snap.daily.len(), 3);
    assert_eq!(snap.hourly.len(), 2);
}

#[tokio::test]
async fn air_quality_request_samples_latest_hour() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/air-quality"))
        .and(query_param("hourly", "pm10,pm2_5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(air_body()))
        .mount(&server)
        .await;

    let source = source_for(&server, Duration::from_secs(5));
    let aq = source
        .air_quality(&CANDIDATE_CITIES[1])
        .await
        .expect("air quality parses");

    let expected = AirQualitySnapshot {
        pm25: Some(26.5),
        pm10: Some(41.5),
    };
    assert_eq!(aq, Some(expected));
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let server = MockServer::start().await;
    let busy = ResponseTemplate::new(503).set_body_string("upstream busy");
    mount_forecast(&server, busy).await;

    let source = source_for(&server, Duration::from_secs(5));
    let err = source.forecast(&CANDIDATE_CITIES[0]).await.unwrap_err();

    match err {
        SourceError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "upstream busy");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn broken_air_quality_still_yields_report() {
    let server = MockServer::start().await;
    mount_forecast(&server, ok_json(forecast_body())).await;
    let broken = ResponseTemplate::new(200).set_body_string("<html>oops</html>");
    mount_air(&server, broken).await;

    let orch = ForecastOrchestrator::new(
        Arc::new(source_for(&server, Duration::from_secs(5))),
        Preferences::in_memory(),
        CANDIDATE_CITIES[0].clone(),
        Lang::En,
    );

    let state = orch.select_and_wait(CANDIDATE_CITIES[0].clone()).await;
    let FetchStatus::Ready(report) = &state.status else {
        panic!("expected ready, got {:?}", state.status);
    };

    assert_eq!(report.air_quality, None);
    // day 0 frost, day 1 rain, day 2 wind + thunderstorm
    let messages: Vec<_> = report.alerts.iter().map(|a| a.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "Frost (≤0°C)",
            "Heavy rainfall (~18 mm)",
            "Strong wind (≥60 km/h)",
            "Thunderstorm risk",
        ]
    );
}

#[tokio::test]
async fn slow_air_quality_times_out_quietly() {
    let server = MockServer::start().await;
    mount_forecast(&server, ok_json(forecast_body())).await;
    let slow = ok_json(air_body()).set_delay(Duration::from_secs(3));
    mount_air(&server, slow).await;

    let orch = ForecastOrchestrator::new(
        Arc::new(source_for(&server, Duration::from_millis(500))),
        Preferences::in_memory(),
        CANDIDATE_CITIES[0].clone(),
        Lang::En,
    );

    let state = orch.select_and_wait(CANDIDATE_CITIES[2].clone()).await;
    match state.status {
        FetchStatus::Ready(report) => assert_eq!(report.air_quality, None),
        other => panic!("expected ready, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_forecast_surfaces_network_error() {
    let server = MockServer::start().await;
    mount_forecast(&server, ResponseTemplate::new(500)).await;
    mount_air(&server, ok_json(air_body())).await;

    let orch = ForecastOrchestrator::new(
        Arc::new(source_for(&server, Duration::from_secs(5))),
        Preferences::in_memory(),
        CANDIDATE_CITIES[0].clone(),
        Lang::En,
    );

    let state = orch.select_and_wait(CANDIDATE_CITIES[4].clone()).await;
    match state.status {
        FetchStatus::Failed(FetchError::Network { city, message }) => {
            assert_eq!(city, "Subotica");
            assert!(message.contains("500"));
        }
        other => panic!("expected network failure, got {other:?}"),
    }
}

#[tokio::test]
async fn misaligned_payload_is_a_parse_failure() {
    let server = MockServer::start().await;
    let mut body = forecast_body();
    body["daily"]["weathercode"] = serde_json::json!([3]);
    mount_forecast(&server, ok_json(body)).await;
    mount_air(&server, ResponseTemplate::new(404)).await;

    let orch = ForecastOrchestrator::new(
        Arc::new(source_for(&server, Duration::from_secs(5))),
        Preferences::in_memory(),
        CANDIDATE_CITIES[0].clone(),
        Lang::En,
    );

    let state = orch.select_and_wait(CANDIDATE_CITIES[0].clone()).await;
    match state.status {
        FetchStatus::Failed(FetchError::Parse { city, .. }) => assert_eq!(city, "Beograd"),
        other => panic!("expected parse failure, got {other:?}"),
    }
}
