use std::sync::Arc;

use url::Url;

use crate::application::applications::ApplicationService;
use crate::application::auth::AuthService;
use crate::application::contacts::ContactService;
use crate::application::events::EventService;
use crate::application::journals::JournalService;
use crate::cache::ResponseCache;
use crate::infra::blob::BlobStorage;
use crate::infra::db::PgRepositories;

#[derive(Clone)]
pub struct AppState {
    pub events: Arc<EventService>,
    pub journals: Arc<JournalService>,
    pub applications: Arc<ApplicationService>,
    pub contacts: Arc<ContactService>,
    pub auth: Arc<AuthService>,
    pub cache: Arc<ResponseCache>,
    pub blobs: Arc<BlobStorage>,
    pub db: Arc<PgRepositories>,
    pub public_base_url: Url,
}
