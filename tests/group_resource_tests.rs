//! Lifecycle tests for the `azuread_group` resource.

mod common;

use azuread_provider::clients::{ApiVersion, InMemoryDirectory};
use azuread_provider::provider::Provider;
use common::acceptance::DirectoryObject;
use common::{BOTH_VERSIONS, ResourceTest, Step, TestData, config, provider, sorted, string_set};
use serde_json::json;

const GROUP: &str = "azuread_group";

fn group_test<'a>(
    provider: &'a Provider,
    directory: &'a InMemoryDirectory,
    data: TestData,
) -> ResourceTest<'a> {
    ResourceTest::new(provider, directory, data, DirectoryObject("groups"))
}

/// A service principal for an application created directly in the directory.
async fn seed_service_principal(provider: &Provider, name: &str) -> String {
    let app = provider
        .create("azuread_application", &config(json!({ "display_name": name })))
        .await
        .unwrap();
    let sp = provider
        .create(
            "azuread_service_principal",
            &config(json!({ "application_id": app.get_str("application_id").unwrap() })),
        )
        .await
        .unwrap();
    sp.id
}

#[tokio::test]
async fn test_group_basic() {
    for version in BOTH_VERSIONS {
        let (provider, directory) = provider(version).await;
        let data = TestData::new(GROUP, "test");
        let name = data.name("acctestGroup");

        group_test(&provider, &directory, data)
            .run(vec![
                Step::Apply(config(json!({ "name": name }))),
                Step::ImportVerify(&[]),
            ])
            .await;
    }
}

#[tokio::test]
async fn test_group_complete() {
    let (provider, directory) = provider(ApiVersion::AadGraph).await;
    let user = directory.seed_user("acctestUser").await;
    let data = TestData::new(GROUP, "test");
    let name = data.name("acctestGroup");

    let mut test = group_test(&provider, &directory, data);
    test.run_steps(vec![Step::Apply(config(json!({
        "name": name,
        "description": "Please delete me as this is a.test.AD group!",
        "members": [user],
        "owners": [user],
    })))])
    .await;

    let state = test.state();
    assert_eq!(
        state.get_str("description"),
        Some("Please delete me as this is a.test.AD group!")
    );
    assert_eq!(string_set(&state.attributes, "members"), vec![user.clone()]);
    assert_eq!(string_set(&state.attributes, "owners"), vec![user.clone()]);
    assert_eq!(state.get_str("object_id"), Some(state.id.as_str()));

    let group = directory.object("groups", &state.id).await.unwrap();
    assert_eq!(group["securityEnabled"], true);
    assert_eq!(group["mailEnabled"], false);
    assert!(group["mailNickname"].as_str().is_some_and(|n| !n.is_empty()));

    test.destroy().await;
}

#[tokio::test]
async fn test_group_diverse_members_and_owners() {
    for version in BOTH_VERSIONS {
        let (provider, directory) = provider(version).await;
        let user = directory.seed_user("acctestUser").await;
        let sp = seed_service_principal(&provider, "acctestApp").await;
        let member_group = provider
            .create(GROUP, &config(json!({ "name": "acctestGroup-member" })))
            .await
            .unwrap()
            .id;

        let data = TestData::new(GROUP, "test");
        let name = data.name("acctestGroup");
        let mut test = group_test(&provider, &directory, data);
        test.run_steps(vec![
            Step::Apply(config(json!({
                "name": name,
                "members": [user, member_group, sp],
                "owners": [user, sp],
            }))),
            Step::ImportVerify(&[]),
        ])
        .await;

        let state = test.state();
        assert_eq!(
            string_set(&state.attributes, "members"),
            sorted(&[user.clone(), member_group.clone(), sp.clone()])
        );
        assert_eq!(
            string_set(&state.attributes, "owners"),
            sorted(&[user.clone(), sp.clone()])
        );

        test.destroy().await;
    }
}

#[tokio::test]
async fn test_group_members_update() {
    for version in BOTH_VERSIONS {
        let (provider, directory) = provider(version).await;
        let a = directory.seed_user("acctestUser-A").await;
        let b = directory.seed_user("acctestUser-B").await;
        let c = directory.seed_user("acctestUser-C").await;
        let sp = seed_service_principal(&provider, "acctestApp").await;

        let data = TestData::new(GROUP, "test");
        let name = data.name("acctestGroup");
        let mut test = group_test(&provider, &directory, data);

        test.run_steps(vec![Step::Apply(config(json!({ "name": name }))), Step::ImportVerify(&[])])
            .await;
        let id = test.state().id.clone();
        assert!(directory.links(&id, "members").await.is_empty());

        test.run_steps(vec![
            Step::Apply(config(json!({ "name": name, "members": [a] }))),
            Step::ImportVerify(&[]),
        ])
        .await;
        assert_eq!(directory.links(&id, "members").await, [a.clone()].into());

        test.run_steps(vec![
            Step::Apply(config(json!({ "name": name, "members": [a, b, c] }))),
            Step::ImportVerify(&[]),
        ])
        .await;
        assert_eq!(
            directory.links(&id, "members").await,
            [a.clone(), b.clone(), c.clone()].into()
        );

        test.run_steps(vec![
            Step::Apply(config(json!({ "name": name, "members": [sp] }))),
            Step::ImportVerify(&[]),
        ])
        .await;
        assert_eq!(directory.links(&id, "members").await, [sp.clone()].into());

        test.run_steps(vec![
            Step::Apply(config(json!({ "name": name, "members": [] }))),
            Step::ImportVerify(&[]),
        ])
        .await;
        assert!(directory.links(&id, "members").await.is_empty());
        assert_eq!(test.state().id, id, "membership changes must not replace the group");

        test.destroy().await;
    }
}

#[tokio::test]
async fn test_group_owners_update() {
    let (provider, directory) = provider(ApiVersion::MsGraph).await;
    let a = directory.seed_user("acctestUser-A").await;
    let b = directory.seed_user("acctestUser-B").await;
    let c = directory.seed_user("acctestUser-C").await;

    let data = TestData::new(GROUP, "test");
    let name = data.name("acctestGroup");
    let mut test = group_test(&provider, &directory, data);

    test.run_steps(vec![
        Step::Apply(config(json!({ "name": name, "owners": [a] }))),
        Step::Apply(config(json!({ "name": name, "owners": [a, b, c] }))),
        Step::ImportVerify(&[]),
    ])
    .await;
    let id = test.state().id.clone();
    assert_eq!(
        directory.links(&id, "owners").await,
        [a.clone(), b.clone(), c.clone()].into()
    );

    // unconfigured owners are left alone
    test.run_steps(vec![Step::Apply(config(json!({ "name": name, "description": "d" })))])
        .await;
    assert_eq!(directory.links(&id, "owners").await.len(), 3);

    test.run_steps(vec![Step::Apply(config(json!({ "name": name, "owners": [c] })))])
        .await;
    assert_eq!(directory.links(&id, "owners").await, [c.clone()].into());

    test.destroy().await;
}

#[tokio::test]
async fn test_group_members_and_owners_are_independent() {
    let (provider, directory) = provider(ApiVersion::AadGraph).await;
    let a = directory.seed_user("acctestUser-A").await;
    let b = directory.seed_user("acctestUser-B").await;
    let c = directory.seed_user("acctestUser-C").await;

    let data = TestData::new(GROUP, "test");
    let name = data.name("acctestGroup");
    let mut test = group_test(&provider, &directory, data);
    test.run_steps(vec![Step::Apply(config(json!({
        "name": name,
        "owners": [a],
        "members": [b, c],
    })))])
    .await;

    let id = test.state().id.clone();
    assert_eq!(directory.links(&id, "owners").await, [a.clone()].into());
    assert_eq!(directory.links(&id, "members").await, [b.clone(), c.clone()].into());

    test.destroy().await;
}

#[tokio::test]
async fn test_group_description_can_be_removed() {
    let (provider, directory) = provider(ApiVersion::AadGraph).await;
    let data = TestData::new(GROUP, "test");
    let name = data.name("acctestGroup");
    let mut test = group_test(&provider, &directory, data);

    test.run_steps(vec![
        Step::Apply(config(json!({ "name": name, "description": "first" }))),
        Step::Apply(config(json!({ "name": name }))),
    ])
    .await;

    let id = test.state().id.clone();
    let group = directory.object("groups", &id).await.unwrap();
    assert!(group.get("description").is_none());

    test.destroy().await;
}

#[tokio::test]
async fn test_group_rename_replaces() {
    let (provider, directory) = provider(ApiVersion::MsGraph).await;
    let data = TestData::new(GROUP, "test");
    let mut test = group_test(&provider, &directory, data);

    test.run_steps(vec![Step::Apply(config(json!({ "name": "acctestGroup-old" })))])
        .await;
    let old_id = test.state().id.clone();

    test.run_steps(vec![Step::Apply(config(json!({ "name": "acctestGroup-new" })))])
        .await;
    assert_ne!(test.state().id, old_id);
    assert!(directory.object("groups", &old_id).await.is_none());

    test.destroy().await;
}

#[tokio::test]
async fn test_group_prevent_duplicate_names_pass() {
    let (provider, directory) = provider(ApiVersion::AadGraph).await;
    let data = TestData::new(GROUP, "test");
    let name = data.name("acctestGroup");

    group_test(&provider, &directory, data)
        .run(vec![
            Step::Apply(config(json!({ "name": name, "prevent_duplicate_names": true }))),
            Step::ImportVerify(&["prevent_duplicate_names"]),
        ])
        .await;
}

#[tokio::test]
async fn test_group_prevent_duplicate_names_fail() {
    for version in BOTH_VERSIONS {
        let (provider, directory) = provider(version).await;
        let data = TestData::new(GROUP, "test");
        let name = data.name("acctestGroup");

        let existing = provider
            .create(GROUP, &config(json!({ "name": name })))
            .await
            .unwrap();

        group_test(&provider, &directory, data)
            .run(vec![Step::ApplyExpectError(
                config(json!({ "name": name, "prevent_duplicate_names": true })),
                "existing Group",
            )])
            .await;

        let err = provider
            .create(GROUP, &config(json!({ "name": name, "prevent_duplicate_names": true })))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(err.attribute(), Some("name"));
        assert!(err.to_string().contains(&existing.id));
        assert_eq!(directory.count("groups").await, 1);
    }
}

#[tokio::test]
async fn test_group_removed_outside_is_dropped_from_state() {
    let (provider, directory) = provider(ApiVersion::AadGraph).await;
    let state = provider
        .create(GROUP, &config(json!({ "name": "acctestGroup-gone" })))
        .await
        .unwrap();

    provider.delete(GROUP, &state).await.unwrap();
    assert!(provider.read(GROUP, &state).await.unwrap().is_none());

    // deleting again is not an error
    provider.delete(GROUP, &state).await.unwrap();
    assert_eq!(directory.count("groups").await, 0);
}

#[tokio::test]
async fn test_group_import_validates_id() {
    let (provider, _directory) = provider(ApiVersion::MsGraph).await;

    let err = provider.import(GROUP, "not-a-uuid").await.unwrap_err();
    assert!(err.is_validation());

    let err = provider
        .import(GROUP, "00000000-0000-0000-0000-000000000123")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Cannot import non-existent remote object"));
}

#[tokio::test]
async fn test_group_rejects_invalid_members() {
    let (provider, directory) = provider(ApiVersion::AadGraph).await;
    let err = provider
        .create(GROUP, &config(json!({ "name": "acctestGroup", "members": ["nope"] })))
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(directory.count("groups").await, 0);
}

#[tokio::test]
async fn test_group_failed_owner_add_keeps_created_group_in_state() {
    for version in BOTH_VERSIONS {
        let (provider, directory) = provider(version).await;
        let missing_owner = "00000000-0000-0000-0000-0000000000ff";
        let group = config(json!({ "name": "acctestGroup-tainted", "owners": [missing_owner] }));

        let err = provider.create(GROUP, &group).await.unwrap_err();
        assert!(err.is_not_found());
        let tainted = err.tainted_state().expect("created group is tracked");
        assert!(directory.object("groups", &tainted.id).await.is_some());
        assert_eq!(tainted.get_str("name"), Some("acctestGroup-tainted"));

        provider.delete(GROUP, tainted).await.unwrap();
        assert_eq!(directory.count("groups").await, 0);

        let mut test = group_test(&provider, &directory, TestData::new(GROUP, "test"));
        test.run_steps(vec![Step::ApplyExpectError(group, "Adding owners to group")])
            .await;
        assert!(test.has_state(), "half-created group is recorded");
        test.destroy().await;
        assert_eq!(directory.count("groups").await, 0);
    }
}
