//! Organisation model probing and both adapter shapes.

use std::sync::Mutex;

use rstest::{fixture, rstest};

use super::*;
use crate::domain::UserId;
use crate::domain::ports::{InMemoryIdentityService, OrganisationShape, UserPage};

fn typed_service() -> Arc<InMemoryIdentityService> {
    Arc::new(InMemoryIdentityService::new(OrganisationShape::UserTypes {
        types: vec!["admin".to_owned(), "editor".to_owned()],
    }))
}

#[fixture]
fn grouped_service() -> Arc<InMemoryIdentityService> {
    Arc::new(InMemoryIdentityService::new(OrganisationShape::UserGroups {
        groups: vec!["admin".to_owned(), "editor".to_owned(), "writer".to_owned()],
    }))
}

#[rstest]
#[case::types(OrganisationShape::UserTypes { types: vec![] }, OrganisationModel::SingleSelect)]
#[case::groups(OrganisationShape::UserGroups { groups: vec![] }, OrganisationModel::MultiGroup)]
#[case::neither(OrganisationShape::Unsupported, OrganisationModel::NotImplemented)]
fn detects_service_shape(#[case] shape: OrganisationShape, #[case] expected: OrganisationModel) {
    let service = InMemoryIdentityService::new(shape);
    assert_eq!(detect_organisation_model(&service), expected);
}

#[test]
fn cache_keeps_first_resolution() {
    let cache = OrganisationModelCache::new();
    assert_eq!(cache.get(), None);

    let grouped = InMemoryIdentityService::new(OrganisationShape::UserGroups { groups: vec![] });
    assert_eq!(cache.resolve(&grouped), OrganisationModel::MultiGroup);

    let typed = InMemoryIdentityService::new(OrganisationShape::UserTypes { types: vec![] });
    assert_eq!(cache.resolve(&typed), OrganisationModel::MultiGroup);
    assert_eq!(cache.get(), Some(OrganisationModel::MultiGroup));
}

#[test]
fn preset_cache_skips_probing() {
    let cache = OrganisationModelCache::preset(OrganisationModel::SingleSelect);
    let bare = InMemoryIdentityService::new(OrganisationShape::Unsupported);
    assert_eq!(cache.resolve(&bare), OrganisationModel::SingleSelect);
}

#[rstest]
#[case("single-select", Ok(OrganisationModel::SingleSelect))]
#[case(" Multi-Group ", Ok(OrganisationModel::MultiGroup))]
#[case("groups", Ok(OrganisationModel::MultiGroup))]
#[case("auto", Err(UnknownOrganisationModel("auto".to_owned())))]
fn parses_model_names(
    #[case] input: &str,
    #[case] expected: Result<OrganisationModel, UnknownOrganisationModel>,
) {
    assert_eq!(input.parse::<OrganisationModel>(), expected);
}

#[test]
fn single_select_creates_and_assigns_known_types() {
    let service = typed_service();
    let adapter = SingleSelectOrganisation::new(service.clone());

    let mut user = adapter
        .create_user("ada", "ada@example.org", "Editor")
        .expect("service call")
        .expect("user created");
    assert_eq!(adapter.membership(&user), "editor");

    assert!(adapter.set_membership(&mut user, "admin").expect("service call"));
    assert_eq!(adapter.membership(&user), "admin");

    assert!(!adapter.set_membership(&mut user, "writer").expect("service call"));
    assert_eq!(adapter.membership(&user), "admin");
}

#[test]
fn single_select_declines_unknown_type_on_create() {
    let adapter = SingleSelectOrganisation::new(typed_service());
    let created = adapter
        .create_user("ada", "ada@example.org", "writer")
        .expect("service call");
    assert!(created.is_none());
}

#[rstest]
fn multi_group_adds_known_aliases_and_keeps_existing(
    grouped_service: Arc<InMemoryIdentityService>,
) {
    let adapter = MultiGroupOrganisation::new(grouped_service);
    let mut user = adapter
        .create_user("ada", "ada@example.org", "writer")
        .expect("service call")
        .expect("user created");
    assert_eq!(adapter.membership(&user), "writer");

    assert!(
        adapter
            .set_membership(&mut user, "admin.ghost..editor")
            .expect("service call")
    );
    assert_eq!(adapter.membership(&user), "admin.editor.writer");
}

#[rstest]
fn multi_group_creates_user_even_without_known_groups(
    grouped_service: Arc<InMemoryIdentityService>,
) {
    let adapter = MultiGroupOrganisation::new(grouped_service);
    let user = adapter
        .create_user("ada", "ada@example.org", "ghost")
        .expect("service call")
        .expect("user created");
    assert_eq!(user.membership, Membership::Groups(BTreeSet::new()));
}

#[rstest]
fn lists_membership_names(grouped_service: Arc<InMemoryIdentityService>) {
    let adapter = MultiGroupOrganisation::new(grouped_service);
    assert_eq!(
        adapter.membership_names().expect("names"),
        vec!["admin", "editor", "writer"]
    );
}

#[test]
fn unsupported_adapter_reports_nothing() {
    let adapter = UnsupportedOrganisation;
    let mut user = UserRecord::new(UserId::new("1"), "ada", "Ada", "ada@example.org");
    user.membership = Membership::Organisation("admin".to_owned());

    assert_eq!(adapter.model(), OrganisationModel::NotImplemented);
    assert!(adapter.create_user("ada", "a@b.c", "admin").expect("call").is_none());
    assert!(!adapter.set_membership(&mut user, "admin").expect("call"));
    assert_eq!(adapter.membership(&user), "");
    assert!(adapter.membership_names().expect("call").is_empty());
    assert!(adapter.all_users().expect("call").is_empty());
}

#[rstest]
#[case::types(OrganisationShape::UserTypes { types: vec![] }, OrganisationModel::SingleSelect)]
#[case::groups(OrganisationShape::UserGroups { groups: vec![] }, OrganisationModel::MultiGroup)]
#[case::neither(OrganisationShape::Unsupported, OrganisationModel::NotImplemented)]
fn factory_matches_detected_model(
    #[case] shape: OrganisationShape,
    #[case] expected: OrganisationModel,
) {
    let service: Arc<dyn IdentityService> = Arc::new(InMemoryIdentityService::new(shape));
    let adapter = organisation_adapter(service, &OrganisationModelCache::new());
    assert_eq!(adapter.model(), expected);
}

/// Service serving `total` synthetic users and recording requested pages.
struct PagedService {
    total: usize,
    requests: Mutex<Vec<(usize, usize)>>,
}

impl IdentityService for PagedService {
    fn find_by_email(&self, _email: &str) -> Result<Option<UserRecord>, IdentityServiceError> {
        Ok(None)
    }

    fn find_by_id(&self, _id: &UserId) -> Result<Option<UserRecord>, IdentityServiceError> {
        Ok(None)
    }

    fn save(&self, _user: &UserRecord) -> Result<(), IdentityServiceError> {
        Ok(())
    }

    fn list_users(
        &self,
        page: usize,
        page_size: usize,
    ) -> Result<UserPage, IdentityServiceError> {
        self.requests
            .lock()
            .map_err(|_| IdentityServiceError::unavailable("poisoned"))?
            .push((page, page_size));
        let start = (page * page_size).min(self.total);
        let end = (start + page_size).min(self.total);
        Ok(UserPage {
            users: (start..end)
                .map(|index| {
                    UserRecord::new(
                        UserId::new(index.to_string()),
                        format!("u{index}"),
                        format!("User {index}"),
                        format!("u{index}@example.org"),
                    )
                })
                .collect(),
            total: self.total,
        })
    }
}

#[rstest]
#[case::partial_last_page(2500, vec![(0, 1000), (1, 1000), (2, 1000)])]
#[case::exact_multiple(2000, vec![(0, 1000), (1, 1000)])]
#[case::empty(0, vec![(0, 1000)])]
fn single_select_walks_every_page(#[case] total: usize, #[case] expected: Vec<(usize, usize)>) {
    let service = Arc::new(PagedService {
        total,
        requests: Mutex::new(Vec::new()),
    });
    let adapter = SingleSelectOrganisation::new(service.clone());

    let users = adapter.all_users().expect("all users");

    assert_eq!(users.len(), total);
    let requests = service.requests.lock().expect("requests").clone();
    assert_eq!(requests, expected);
}

#[test]
fn multi_group_reads_one_large_page() {
    let service = Arc::new(PagedService {
        total: 1500,
        requests: Mutex::new(Vec::new()),
    });
    let adapter = MultiGroupOrganisation::new(service.clone());

    assert_eq!(adapter.all_users().expect("all users").len(), 1500);
    let requests = service.requests.lock().expect("requests").clone();
    assert_eq!(requests, vec![(0, MULTI_GROUP_PAGE_SIZE)]);
}
