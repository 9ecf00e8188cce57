//! Lifecycle shared by the application certificate and password resources.
//!
//! Both credential kinds live in a list-valued field of the parent application,
//! so every mutation is a read-modify-write of the whole list. The list is only
//! touched while holding the application's named lock.

use super::APPLICATION_RESOURCE_NAME;
use crate::clients::Client;
use crate::error::{ErrorContext, ProviderError, ProviderResult, ValidationResult};
use crate::ids::{CredentialId, CredentialKind};
use crate::models::Application;
use crate::state::ResourceData;
use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;

/// A kind of credential stored on an application.
pub(super) trait ApplicationCredential {
    type Credential: Send + Sync;

    const KIND: CredentialKind;
    const RESOURCE_TYPE: &'static str;

    fn build(data: &ResourceData) -> ValidationResult<Self::Credential>;

    fn key_id(credential: &Self::Credential) -> Option<&str>;

    /// The credentials of this kind currently held by `app`.
    fn credentials(app: Application) -> Vec<Self::Credential>;

    /// An application PATCH body replacing the whole credential list.
    fn patch(credentials: Vec<Self::Credential>) -> Application;

    /// Write kind specific attributes of `credential` into `data`.
    fn flatten(data: &mut ResourceData, credential: &Self::Credential);
}

pub(super) fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(super) async fn create<C: ApplicationCredential>(
    client: &Client,
    data: &mut ResourceData,
) -> ProviderResult<()> {
    let object_id = data.get_string("application_object_id").unwrap_or_default();

    let credential = match C::build(data) {
        Ok(credential) => credential,
        Err(err) => {
            let attribute = err.attribute().unwrap_or("value").to_string();
            return Err(ProviderError::from(err)
                .context(format!(
                    "Generating {} credentials for application with object ID {object_id:?}",
                    C::KIND
                ))
                .at(attribute));
        }
    };
    let key_id = C::key_id(&credential)
        .ok_or_else(|| ProviderError::bad_response("Generated credential has no key ID"))?
        .to_string();
    let id = CredentialId::new(object_id.clone(), C::KIND, key_id.clone());

    let lock = client
        .locks
        .lock(APPLICATION_RESOURCE_NAME, &object_id)
        .await;

    let app = client
        .applications
        .get(&object_id)
        .await
        .with_context(|| format!("Retrieving application with object ID {object_id:?}"))
        .at("application_object_id")?
        .ok_or_else(|| {
            ProviderError::not_found("Application", &object_id).at("application_object_id")
        })?;

    let mut credentials = C::credentials(app);
    if credentials
        .iter()
        .any(|c| C::key_id(c) == Some(key_id.as_str()))
    {
        return Err(ProviderError::AlreadyExists {
            resource_type: C::RESOURCE_TYPE.to_string(),
            id: id.to_string(),
        });
    }
    credentials.push(credential);

    client
        .applications
        .update(&object_id, &C::patch(credentials))
        .await
        .with_context(|| {
            format!(
                "Adding {} for application with object ID {object_id:?}",
                C::KIND
            )
        })?;

    data.set_id(id.to_string());
    drop(lock);

    read::<C>(client, data).await
}

pub(super) async fn read<C: ApplicationCredential>(
    client: &Client,
    data: &mut ResourceData,
) -> ProviderResult<()> {
    let Some(raw_id) = data.id().map(str::to_string) else {
        return Ok(());
    };
    let id = CredentialId::parse_kind(&raw_id, C::KIND)
        .with_context(|| format!("Parsing {} with ID {raw_id:?}", C::KIND))?;

    let app = client
        .applications
        .get(&id.object_id)
        .await
        .with_context(|| format!("Retrieving application with object ID {:?}", id.object_id))
        .at("application_object_id")?
        .ok_or_else(|| {
            ProviderError::not_found("Application", &id.object_id).at("application_object_id")
        })?;

    let Some(credential) = C::credentials(app)
        .into_iter()
        .find(|c| C::key_id(c) == Some(id.key_id.as_str()))
    else {
        debug!(
            "{} {:?} for application with object ID {:?} was not found - removing from state!",
            C::KIND,
            id.key_id,
            id.object_id
        );
        data.clear_id();
        return Ok(());
    };

    data.set("application_object_id", id.object_id.clone());
    data.set("key_id", id.key_id.clone());
    C::flatten(data, &credential);

    Ok(())
}

pub(super) async fn delete<C: ApplicationCredential>(
    client: &Client,
    data: &ResourceData,
) -> ProviderResult<()> {
    let Some(raw_id) = data.id() else {
        return Ok(());
    };
    let id = CredentialId::parse_kind(raw_id, C::KIND)
        .with_context(|| format!("Parsing {} with ID {raw_id:?}", C::KIND))?;

    let _lock = client
        .locks
        .lock(APPLICATION_RESOURCE_NAME, &id.object_id)
        .await;

    let Some(app) = client
        .applications
        .get(&id.object_id)
        .await
        .with_context(|| format!("Retrieving application with object ID {:?}", id.object_id))?
    else {
        debug!(
            "Application with object ID {:?} was not found, its {} is already gone",
            id.object_id,
            C::KIND
        );
        return Ok(());
    };

    let credentials: Vec<_> = C::credentials(app)
        .into_iter()
        .filter(|c| C::key_id(c).is_some_and(|key_id| key_id != id.key_id))
        .collect();

    client
        .applications
        .update(&id.object_id, &C::patch(credentials))
        .await
        .with_context(|| {
            format!(
                "Removing {} {:?} from application with object ID {:?}",
                C::KIND,
                id.key_id,
                id.object_id
            )
        })?;

    Ok(())
}
