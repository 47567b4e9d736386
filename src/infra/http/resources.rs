//! Response shapes: stored blob paths are augmented with public URLs built
//! from the configured base.

use serde::Serialize;
use url::Url;

use crate::application::events::EventWithGallery;
use crate::domain::entities::{
    ApplicationRecord, ContactRequestRecord, EventGalleryRecord, JournalRecord,
};
use crate::infra::blob;

#[derive(Debug, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: crate::domain::entities::EventRecord,
    pub featured_image_url: Option<String>,
    pub gallery: Vec<GalleryView>,
}

#[derive(Debug, Serialize)]
pub struct GalleryView {
    #[serde(flatten)]
    pub image: EventGalleryRecord,
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct JournalView {
    #[serde(flatten)]
    pub journal: JournalRecord,
    pub journal_pdf_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub featured_image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationView {
    #[serde(flatten)]
    pub application: ApplicationRecord,
    pub resume_url: Option<String>,
}

pub fn event_view(base: &Url, with_gallery: EventWithGallery) -> EventView {
    let EventWithGallery { event, gallery } = with_gallery;
    let featured_image_url = event
        .featured_image
        .as_deref()
        .map(|path| blob::public_url(base, path));
    let gallery = gallery
        .into_iter()
        .map(|image| gallery_view(base, image))
        .collect();
    EventView {
        event,
        featured_image_url,
        gallery,
    }
}

pub fn gallery_view(base: &Url, image: EventGalleryRecord) -> GalleryView {
    let image_url = blob::public_url(base, &image.image_path);
    GalleryView { image, image_url }
}

pub fn journal_view(base: &Url, journal: JournalRecord) -> JournalView {
    let journal_pdf_url = journal
        .journal_pdf
        .as_deref()
        .map(|path| blob::public_url(base, path));
    let cover_image_url = journal
        .cover_image
        .as_deref()
        .map(|path| blob::public_url(base, path));
    let featured_image_url = journal
        .featured_image
        .as_deref()
        .map(|path| blob::public_url(base, path));
    JournalView {
        journal,
        journal_pdf_url,
        cover_image_url,
        featured_image_url,
    }
}

pub fn application_view(base: &Url, application: ApplicationRecord) -> ApplicationView {
    let resume_url = application
        .resume_path
        .as_deref()
        .map(|path| blob::public_url(base, path));
    ApplicationView {
        application,
        resume_url,
    }
}

/// Contact requests carry no blobs; they serialize as stored.
pub type ContactView = ContactRequestRecord;
