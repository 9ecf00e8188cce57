//! Lifecycle tests for `azuread_service_principal` and its data source.

mod common;

use azuread_provider::clients::ApiVersion;
use azuread_provider::provider::Provider;
use common::acceptance::DirectoryObject;
use common::{BOTH_VERSIONS, ResourceTest, Step, TestData, config, provider, string_set};
use serde_json::json;

const SERVICE_PRINCIPAL: &str = "azuread_service_principal";

async fn application(provider: &Provider, name: &str) -> String {
    provider
        .create("azuread_application", &config(json!({ "display_name": name })))
        .await
        .unwrap()
        .get_str("application_id")
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_service_principal_basic_and_update() {
    for version in BOTH_VERSIONS {
        let (provider, directory) = provider(version).await;
        let data = TestData::new(SERVICE_PRINCIPAL, "test");
        let name = data.name("acctestApp");
        let application_id = application(&provider, &name).await;

        let mut test = ResourceTest::new(&provider, &directory, data, DirectoryObject("servicePrincipals"));
        test.run_steps(vec![
            Step::Apply(config(json!({ "application_id": application_id }))),
            Step::ImportVerify(&[]),
        ])
        .await;

        let id = test.state().id.clone();
        assert_eq!(test.state().get_str("display_name"), Some(name.as_str()));
        assert_eq!(test.state().attributes["app_role_assignment_required"], false);

        test.run_steps(vec![
            Step::Apply(config(json!({
                "application_id": application_id,
                "app_role_assignment_required": true,
                "tags": ["WindowsAzureActiveDirectoryIntegratedApp", "HideApp"],
            }))),
            Step::ImportVerify(&[]),
        ])
        .await;

        let state = test.state();
        assert_eq!(state.id, id, "tags and assignment changes update in place");
        assert_eq!(state.attributes["app_role_assignment_required"], true);
        assert_eq!(
            string_set(&state.attributes, "tags"),
            vec!["HideApp", "WindowsAzureActiveDirectoryIntegratedApp"]
        );

        test.destroy().await;
    }
}

#[tokio::test]
async fn test_service_principal_requires_existing_application() {
    let (provider, directory) = provider(ApiVersion::AadGraph).await;
    let err = provider
        .create(
            SERVICE_PRINCIPAL,
            &config(json!({ "application_id": "00000000-0000-0000-0000-000000000404" })),
        )
        .await
        .unwrap_err();

    assert!(matches!(err.root(), azuread_provider::ProviderError::Api(_)));
    assert_eq!(directory.count("servicePrincipals").await, 0);
}

#[tokio::test]
async fn test_service_principal_delete_is_idempotent() {
    let (provider, _directory) = provider(ApiVersion::MsGraph).await;
    let application_id = application(&provider, "acctestApp").await;
    let state = provider
        .create(SERVICE_PRINCIPAL, &config(json!({ "application_id": application_id })))
        .await
        .unwrap();

    provider.delete(SERVICE_PRINCIPAL, &state).await.unwrap();
    provider.delete(SERVICE_PRINCIPAL, &state).await.unwrap();
    assert!(provider.read(SERVICE_PRINCIPAL, &state).await.unwrap().is_none());
}

#[tokio::test]
async fn test_service_principal_data_source() {
    for version in BOTH_VERSIONS {
        let (provider, _directory) = provider(version).await;
        let application_id = application(&provider, "acctest-sp-lookup").await;
        let sp = provider
            .create(SERVICE_PRINCIPAL, &config(json!({ "application_id": application_id })))
            .await
            .unwrap();

        for lookup in [
            json!({ "object_id": sp.id }),
            json!({ "display_name": "acctest-sp-lookup" }),
            json!({ "application_id": application_id }),
        ] {
            let found = provider
                .read_data_source(SERVICE_PRINCIPAL, &config(lookup))
                .await
                .unwrap();
            assert_eq!(found.id, sp.id);
            assert_eq!(found.get_str("application_id"), Some(application_id.as_str()));
            assert!(found.attributes["app_roles"].is_array());
            assert!(found.attributes["oauth2_permissions"].is_array());
        }

        let err = provider
            .read_data_source(SERVICE_PRINCIPAL, &config(json!({ "display_name": "nobody" })))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.diagnostic().summary, "Service principal not found");

        let err = provider
            .read_data_source(
                SERVICE_PRINCIPAL,
                &config(json!({ "object_id": sp.id, "display_name": "acctest-sp-lookup" })),
            )
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }
}
