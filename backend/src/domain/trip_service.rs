//! Trip registry use-cases.
//!
//! Creation validates the draft and commits the trip row before the image
//! upload runs, so a failed upload surfaces an explicit error while the
//! trip stays valid with no image. Completion is an at-most-once flip
//! backed by the repository's conditional update.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use super::access::{self, Operation};
use super::error::Error;
use super::ports::{CompletionOutcome, ImageStore, TripRepository, UserRepository};
use super::trip::{Trip, TripDraft, TripId};
use super::user::{Role, UserId, Username};

/// Lightweight member reference embedded in trip detail views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonRef {
    /// The member's username.
    pub username: Username,
    /// The member's display name.
    pub full_name: String,
}

/// Trip detail with resolved guide/creator display info.
#[derive(Debug, Clone, PartialEq)]
pub struct TripDetail {
    /// The trip record.
    pub trip: Trip,
    /// Assigned guide, when the reference resolves.
    pub guide: Option<PersonRef>,
    /// Creating member, when the reference resolves.
    pub created_by: Option<PersonRef>,
}

/// Trips partitioned by the completion flag.
#[derive(Debug, Clone, Default)]
pub struct TripBoard {
    /// Trips still ahead.
    pub active: Vec<Trip>,
    /// Completed trips.
    pub completed: Vec<Trip>,
}

/// Image bytes captured from a multipart upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Raw file content.
    pub bytes: Vec<u8>,
}

/// Trip registry service.
#[derive(Clone)]
pub struct TripService {
    trips: Arc<dyn TripRepository>,
    users: Arc<dyn UserRepository>,
    images: Arc<dyn ImageStore>,
}

impl TripService {
    /// Create a service over the given ports.
    pub fn new(
        trips: Arc<dyn TripRepository>,
        users: Arc<dyn UserRepository>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            trips,
            users,
            images,
        }
    }

    /// Validate and create a trip; admins only.
    ///
    /// The trip row is committed first. When an image is attached its
    /// upload runs afterwards; an upload failure is surfaced as an error
    /// while the already-created trip remains valid without an image.
    pub async fn create(
        &self,
        caller_role: Role,
        draft: TripDraft,
        image: Option<ImageUpload>,
        created_by: UserId,
    ) -> Result<Trip, Error> {
        access::require(caller_role, Operation::CreateTrip)?;

        let new_trip = draft
            .validate(created_by)
            .map_err(|err| Error::invalid_request(err.to_string()))?;

        let trip = self.trips.insert(new_trip).await.map_err(Error::from)?;
        info!(trip = %trip.id, peak = %trip.peak, "trip created");

        let Some(image) = image else {
            return Ok(trip);
        };

        let hint = format!("trips/{}", trip.id);
        let url = match self.images.upload(image.bytes, &hint).await {
            Ok(url) => url,
            Err(err) => {
                warn!(trip = %trip.id, error = %err, "trip image upload failed");
                return Err(Error::internal("image upload failed")
                    .with_details(json!({ "tripId": trip.id, "code": "image_upload_failed" })));
            }
        };

        self.trips
            .set_image_url(&trip.id, &url)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::not_found("trip not found"))
    }

    /// List trips partitioned by the completion flag, creation order.
    pub async fn list(&self) -> Result<TripBoard, Error> {
        let mut board = TripBoard::default();
        for trip in self.trips.list().await.map_err(Error::from)? {
            if trip.completed {
                board.completed.push(trip);
            } else {
                board.active.push(trip);
            }
        }
        Ok(board)
    }

    /// Public trip detail with resolved guide/creator display info.
    pub async fn get(&self, id: &TripId) -> Result<TripDetail, Error> {
        let trip = self
            .trips
            .find_by_id(id)
            .await
            .map_err(Error::from)?
            .ok_or_else(|| Error::not_found("trip not found"))?;

        let guide = match trip.guide_id {
            Some(guide_id) => self.person_ref(&guide_id).await?,
            None => None,
        };
        let created_by = self.person_ref(&trip.created_by).await?;

        Ok(TripDetail {
            trip,
            guide,
            created_by,
        })
    }

    /// Mark a trip completed; admins and guides only, at most once.
    pub async fn complete(&self, caller_role: Role, id: &TripId) -> Result<Trip, Error> {
        access::require(caller_role, Operation::CompleteTrip)?;

        match self.trips.complete(id).await.map_err(Error::from)? {
            CompletionOutcome::Completed(trip) => {
                info!(trip = %trip.id, "trip completed");
                Ok(trip)
            }
            CompletionOutcome::AlreadyCompleted => Err(Error::conflict(
                "trip is already completed",
            )
            .with_details(json!({ "code": "already_completed" }))),
            CompletionOutcome::Missing => Err(Error::not_found("trip not found")),
        }
    }

    async fn person_ref(&self, id: &UserId) -> Result<Option<PersonRef>, Error> {
        let user = self.users.find_by_id(id).await.map_err(Error::from)?;
        Ok(user.map(|user| PersonRef {
            username: user.username,
            full_name: user.full_name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::ImageStoreError;
    use crate::test_support::{seeded_member, InMemoryTrips, InMemoryUsers};
    use async_trait::async_trait;
    use rstest::rstest;

    struct FixedUrlImageStore;

    #[async_trait]
    impl ImageStore for FixedUrlImageStore {
        async fn upload(&self, _bytes: Vec<u8>, hint: &str) -> Result<String, ImageStoreError> {
            Ok(format!("https://cdn.example/{hint}.jpg"))
        }
    }

    struct FailingImageStore;

    #[async_trait]
    impl ImageStore for FailingImageStore {
        async fn upload(&self, _bytes: Vec<u8>, _hint: &str) -> Result<String, ImageStoreError> {
            Err(ImageStoreError::upload("cdn rejected the file"))
        }
    }

    fn draft() -> TripDraft {
        TripDraft {
            name: "Spring ascent".into(),
            peak: "Triglav".into(),
            date: "2026-05-09".into(),
            difficulty: "T3".into(),
            distance_km: "12.5".into(),
            ascent_m: "800".into(),
            ..TripDraft::default()
        }
    }

    fn service(images: Arc<dyn ImageStore>) -> (TripService, Arc<InMemoryTrips>, UserId) {
        let users = Arc::new(InMemoryUsers::default());
        let admin = seeded_member(&users, "ana", Role::Admin);
        let trips = Arc::new(InMemoryTrips::default());
        (
            TripService::new(trips.clone(), users, images),
            trips,
            admin.id,
        )
    }

    #[rstest]
    #[case(Role::Member)]
    #[case(Role::Guide)]
    #[case(Role::Secretary)]
    #[tokio::test]
    async fn creation_is_admin_only(#[case] caller: Role) {
        let (service, _, admin) = service(Arc::new(FixedUrlImageStore));
        let err = service
            .create(caller, draft(), None, admin)
            .await
            .expect_err("non-admin rejected");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn creation_without_image_leaves_url_empty() {
        let (service, _, admin) = service(Arc::new(FixedUrlImageStore));
        let trip = service
            .create(Role::Admin, draft(), None, admin)
            .await
            .expect("trip created");
        assert_eq!(trip.image_url, None);
    }

    #[tokio::test]
    async fn creation_with_image_stores_the_cdn_url() {
        let (service, _, admin) = service(Arc::new(FixedUrlImageStore));
        let trip = service
            .create(
                Role::Admin,
                draft(),
                Some(ImageUpload { bytes: vec![0xFF] }),
                admin,
            )
            .await
            .expect("trip created");
        let url = trip.image_url.expect("image url stored");
        assert!(url.starts_with("https://cdn.example/trips/"));
    }

    #[tokio::test]
    async fn failed_upload_surfaces_error_but_keeps_the_trip() {
        let (service, trips, admin) = service(Arc::new(FailingImageStore));
        let err = service
            .create(
                Role::Admin,
                draft(),
                Some(ImageUpload { bytes: vec![0xFF] }),
                admin,
            )
            .await
            .expect_err("upload failure surfaced");
        assert_eq!(err.code(), ErrorCode::InternalError);

        // The trip row was committed before the upload and stays valid.
        let board = service.list().await.expect("list trips");
        assert_eq!(board.active.len(), 1);
        assert_eq!(board.active[0].image_url, None);
        assert_eq!(trips.len(), 1);
    }

    #[tokio::test]
    async fn listing_partitions_by_completion_flag() {
        let (service, _, admin) = service(Arc::new(FixedUrlImageStore));
        let first = service
            .create(Role::Admin, draft(), None, admin)
            .await
            .expect("first trip");
        service
            .create(Role::Admin, draft(), None, admin)
            .await
            .expect("second trip");
        service
            .complete(Role::Admin, &first.id)
            .await
            .expect("completed");

        let board = service.list().await.expect("list trips");
        assert_eq!(board.active.len(), 1);
        assert_eq!(board.completed.len(), 1);
        assert_eq!(board.completed[0].id, first.id);
    }

    #[tokio::test]
    async fn completing_twice_is_a_conflict_and_the_flag_stays_set() {
        let (service, _, admin) = service(Arc::new(FixedUrlImageStore));
        let trip = service
            .create(Role::Admin, draft(), None, admin)
            .await
            .expect("trip created");

        service
            .complete(Role::Guide, &trip.id)
            .await
            .expect("first completion");
        let err = service
            .complete(Role::Admin, &trip.id)
            .await
            .expect_err("second completion rejected");
        assert_eq!(err.code(), ErrorCode::Conflict);

        let detail = service.get(&trip.id).await.expect("trip detail");
        assert!(detail.trip.completed);
    }

    #[tokio::test]
    async fn completion_is_role_gated_and_handles_missing_trips() {
        let (service, _, _) = service(Arc::new(FixedUrlImageStore));
        let err = service
            .complete(Role::Member, &TripId::random())
            .await
            .expect_err("member rejected");
        assert_eq!(err.code(), ErrorCode::Forbidden);

        let err = service
            .complete(Role::Admin, &TripId::random())
            .await
            .expect_err("missing trip");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn detail_embeds_guide_and_creator_display_info() {
        let users = Arc::new(InMemoryUsers::default());
        let admin = seeded_member(&users, "ana", Role::Admin);
        let guide = seeded_member(&users, "marko", Role::Guide);
        let trips = Arc::new(InMemoryTrips::default());
        let service = TripService::new(trips, users, Arc::new(FixedUrlImageStore));

        let mut with_guide = draft();
        with_guide.guide_id = Some(guide.id);
        let trip = service
            .create(Role::Admin, with_guide, None, admin.id)
            .await
            .expect("trip created");

        let detail = service.get(&trip.id).await.expect("trip detail");
        assert_eq!(
            detail.guide.expect("guide resolved").username.as_str(),
            "marko"
        );
        assert_eq!(
            detail.created_by.expect("creator resolved").username.as_str(),
            "ana"
        );
    }
}
