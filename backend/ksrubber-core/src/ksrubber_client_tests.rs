// src/ksrubber_client_tests.rs

#[cfg(test)]
mod tests {
    use crate::ksrubber_client::*;
    use crate::ksrubber_data::*;
    use crate::test_support::date;
    use reqwest::StatusCode;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> KsRubberClient {
        KsRubberClient::new(ClientConfig {
            base_url: server.uri(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_client_rejects_bad_base_url() {
        let empty = KsRubberClient::new(ClientConfig {
            base_url: " ".to_string(),
            timeout_secs: 5,
        });
        assert!(matches!(empty, Err(ApiError::Config(_))));

        let malformed = KsRubberClient::new(ClientConfig {
            base_url: "not a url".to_string(),
            timeout_secs: 5,
        });
        assert!(matches!(malformed, Err(ApiError::UrlParse(_))));
    }

    #[test]
    fn test_endpoint_url_joins_paths() {
        let client = KsRubberClient::new(ClientConfig {
            base_url: "https://example.com/afx/pro_ksrubber/v1/".to_string(),
            timeout_secs: 5,
        })
        .unwrap();

        assert_eq!(
            client.endpoint_url("/get_all_die").unwrap().as_str(),
            "https://example.com/afx/pro_ksrubber/v1/get_all_die"
        );
    }

    #[tokio::test]
    async fn test_list_dies_skips_malformed_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get_all_die"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": [
                    {
                        "DieId": "KSD001",
                        "DieName": "Ring 10",
                        "CompanyName": "Bosch",
                        "Materials": "EPDM",
                        "Cavity": "8",
                        "Weight": 0.25,
                        "Pro_hr_count": "120",
                        "Price": "abc"
                    },
                    { "DieName": "no id" },
                    "junk"
                ]
            })))
            .mount(&server)
            .await;

        let dies = client_for(&server).list_dies().await.unwrap();

        assert_eq!(dies.len(), 1);
        assert_eq!(dies[0].cavity, 8);
        assert_eq!(dies[0].weight, dec!(0.25));
        assert_eq!(dies[0].production_per_hour, dec!(120));
        assert_eq!(dies[0].price, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_non_list_data_reads_as_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/daily-production/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": "nothing" })))
            .mount(&server)
            .await;

        let records = client_for(&server).list_daily_production().await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_daily_production_decodes_parallel_lists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/daily-production/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": [{
                    "sno": 12,
                    "date": "2024-03-01",
                    "DieId": ["KSD001", "KSD002"],
                    "overall_production": [400, "250"],
                    "overall_time": [9, 10.5],
                    "overtime": ["1", 2.5],
                    "price": [100, 250],
                    "monthy_pay": "350.75"
                }]
            })))
            .mount(&server)
            .await;

        let records = client_for(&server).list_daily_production().await.unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.sno, "12");
        assert_eq!(record.production_date(), Some(date(2024, 3, 1)));
        assert_eq!(record.total_overtime(), dec!(3.5));
        assert_eq!(record.monthly_pay, dec!(350.75));
        assert!(!record.is_holiday());
    }

    #[tokio::test]
    async fn test_error_status_carries_backend_message() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/delete_die/KSD001"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Die not found" })))
            .mount(&server)
            .await;

        let err = client_for(&server).delete_die("KSD001").await.unwrap_err();

        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(message, "Die not found");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_explicit_failure_status_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/add_daily_production"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "failed" })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .add_daily_production(&DailyProductionEntry::leave(date(2024, 3, 4)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_add_die_returns_assigned_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/add_die"))
            .and(body_json(json!({
                "DieName": "Seal 5",
                "CompanyName": "Apex",
                "Materials": "NBR",
                "Cavity": 8,
                "Weight": 0.25,
                "Pro_hr_count": 120.0,
                "Price": 1.5
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "DieId": "KSD777"
            })))
            .mount(&server)
            .await;

        let die_id = client_for(&server)
            .add_die(&NewDie {
                die_name: "Seal 5".to_string(),
                company_name: "Apex".to_string(),
                materials: "NBR".to_string(),
                cavity: 8,
                weight: dec!(0.25),
                production_per_hour: dec!(120),
                price: dec!(1.5),
            })
            .await
            .unwrap();

        assert_eq!(die_id, "KSD777");
    }

    #[tokio::test]
    async fn test_base_income_accepts_both_shapes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get-setting-income"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "income": "20000" } })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/setting-income"))
            .and(query_param("income", "21000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "income": 21000 })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.base_income().await.unwrap(), dec!(20000));
        assert_eq!(client.update_base_income(dec!(21000.00)).await.unwrap(), dec!(21000));
    }

    #[tokio::test]
    async fn test_base_income_update_without_income_fails() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/setting-income"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
            .mount(&server)
            .await;

        let err = client_for(&server).update_base_income(dec!(100)).await.unwrap_err();
        assert!(matches!(err, ApiError::MissingField { .. }));
    }

    #[tokio::test]
    async fn test_month_income_shapes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get_month_income/"))
            .and(query_param("month", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": { "income": 18000.5 }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/get_month_income/"))
            .and(query_param("month", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "income": "17500" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/get_month_income/"))
            .and(query_param("month", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "error" })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.month_income(2024, 3).await.unwrap(), dec!(18000.5));
        assert_eq!(client.month_income(2024, 2).await.unwrap(), dec!(17500));
        assert_eq!(client.month_income(2024, 1).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_compute_sends_date_and_flag_in_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/compute_production/"))
            .and(query_param("input_date", "2024-03-10"))
            .and(query_param("sub_flag", "0"))
            .and(body_json(json!({
                "die_ids": ["KSD001"],
                "production_counts": [400],
                "is_holiday": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "new_daily_pro": {
                    "date": "2024-03-10",
                    "overall_time": [6],
                    "overtime": [6],
                    "price": [480],
                    "delete_index_hr": [0],
                    "monthy_pay": 480,
                    "daily_income": 480
                },
                "details": [{ "DieId": "KSD001", "DieName": "Ring 10" }, 5]
            })))
            .mount(&server)
            .await;

        let preview = client_for(&server)
            .compute_production(&ComputeRequest {
                input_date: date(2024, 3, 10),
                sub_flag: SUB_FLAG_HOLIDAY,
                die_ids: vec!["KSD001".to_string()],
                production_counts: vec![400],
                is_holiday: true,
            })
            .await
            .unwrap();

        assert_eq!(preview.new_daily_pro.monthly_pay, dec!(480));
        assert_eq!(preview.details.len(), 1);
        assert_eq!(preview.details[0].die_name, "Ring 10");
    }

    #[tokio::test]
    async fn test_update_expenses_returns_saved_values() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/monthly-income/current"))
            .and(body_json(json!({ "tea": 250.0, "water": 60.5 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": { "tea": "250", "water": 60.5 }
            })))
            .mount(&server)
            .await;

        let saved = client_for(&server)
            .update_current_expenses(&Expenses::new(dec!(250), dec!(60.5)))
            .await
            .unwrap();
        assert_eq!(saved, Expenses::new(dec!(250), dec!(60.5)));
    }
}
