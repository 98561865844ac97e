//! Integration tests for the SurrealDB grant store.

use folio_core::error::FolioError;
use folio_core::models::resource::{CreateResource, ResourceKind, SpaceType, UpdateResource};
use folio_core::models::role::Role;
use folio_core::models::share::Share;
use folio_core::repository::GrantStore;
use folio_db::repository::SurrealGrantStore;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> SurrealGrantStore<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    folio_db::run_migrations(&db).await.unwrap();
    SurrealGrantStore::new(db)
}

#[tokio::test]
async fn create_and_get_resource() {
    let store = setup().await;
    let owner = Uuid::new_v4();
    let department = Uuid::new_v4();

    let root = store
        .create_resource(CreateResource {
            department_id: Some(department),
            ..CreateResource::folder("Engineering", SpaceType::Department, None)
        })
        .await
        .unwrap();
    let doc = store
        .create_resource(CreateResource {
            owner_id: Some(owner),
            ..CreateResource::document("Plan", SpaceType::Department, root.id)
        })
        .await
        .unwrap();

    let fetched = store.get_resource(doc.id).await.unwrap();
    assert_eq!(fetched.kind, ResourceKind::Document);
    assert_eq!(fetched.parent_id, Some(root.id));
    assert_eq!(fetched.owner_id, Some(owner));
    assert_eq!(fetched.revision, 0);
    assert!(!fetched.restricted);

    let root = store.get_resource(root.id).await.unwrap();
    assert!(root.is_space_root());
    assert_eq!(root.department_id, Some(department));
}

#[tokio::test]
async fn get_missing_resource_is_not_found() {
    let store = setup().await;
    let err = store.get_resource(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, FolioError::NotFound { .. }));
}

#[tokio::test]
async fn update_bumps_revision_and_clears_fields() {
    let store = setup().await;
    let owner = Uuid::new_v4();
    let folder = store
        .create_resource(CreateResource {
            owner_id: Some(owner),
            ..CreateResource::folder("Drafts", SpaceType::Public, None)
        })
        .await
        .unwrap();

    let updated = store
        .update_resource(
            folder.id,
            UpdateResource {
                restricted: Some(true),
                owner_id: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(updated.restricted);
    assert_eq!(updated.owner_id, None);
    assert_eq!(updated.name, "Drafts");
    assert_eq!(updated.revision, folder.revision + 1);
}

#[tokio::test]
async fn update_missing_resource_is_not_found() {
    let store = setup().await;
    let err = store
        .update_resource(
            Uuid::new_v4(),
            UpdateResource {
                name: Some("x".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FolioError::NotFound { .. }));
}

#[tokio::test]
async fn candidate_listings_filter_by_attribute() {
    let store = setup().await;
    let dept = Uuid::new_v4();
    let project = Uuid::new_v4();
    let owner = Uuid::new_v4();

    let public_root = store
        .create_resource(CreateResource::folder("Library", SpaceType::Public, None))
        .await
        .unwrap();
    let dept_root = store
        .create_resource(CreateResource {
            department_id: Some(dept),
            ..CreateResource::folder("Sales", SpaceType::Department, None)
        })
        .await
        .unwrap();
    let project_root = store
        .create_resource(CreateResource {
            project_id: Some(project),
            owner_id: Some(owner),
            ..CreateResource::folder("Apollo", SpaceType::Project, None)
        })
        .await
        .unwrap();
    let child = store
        .create_resource(CreateResource::document("Readme", SpaceType::Public, public_root.id))
        .await
        .unwrap();

    let roots = store.list_space_roots().await.unwrap();
    assert_eq!(roots.len(), 3);

    let children = store.list_children(public_root.id).await.unwrap();
    assert_eq!(children.iter().map(|r| r.id).collect::<Vec<_>>(), vec![child.id]);

    let in_dept = store.list_resources_in_departments(vec![dept]).await.unwrap();
    assert_eq!(in_dept.len(), 1);
    assert_eq!(in_dept[0].id, dept_root.id);

    let in_project = store.list_resources_in_projects(vec![project]).await.unwrap();
    assert_eq!(in_project[0].id, project_root.id);

    let owned = store.list_resources_owned_by(owner).await.unwrap();
    assert_eq!(owned.len(), 1);

    let public = store.list_resources_in_space(SpaceType::Public).await.unwrap();
    assert_eq!(public.len(), 2);

    assert!(store.list_resources_in_departments(vec![]).await.unwrap().is_empty());

    let many = store
        .get_resources(vec![child.id, Uuid::new_v4(), dept_root.id])
        .await
        .unwrap();
    assert_eq!(many.len(), 2);

    assert_eq!(store.list_all_resources().await.unwrap().len(), 4);
}

#[tokio::test]
async fn upsert_share_is_idempotent_per_pair() {
    let store = setup().await;
    let folder = store
        .create_resource(CreateResource::folder("Shared", SpaceType::Public, None))
        .await
        .unwrap();
    let user = Uuid::new_v4();

    let first = store.upsert_share(folder.id, user, Role::Viewer).await.unwrap();
    let second = store.upsert_share(folder.id, user, Role::Editor).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.id, Share::key(folder.id, user));
    assert_eq!(second.role, Role::Editor);
    assert_eq!(second.created_at, first.created_at);

    let shares = store.list_shares_for_resource(folder.id).await.unwrap();
    assert_eq!(shares.len(), 1);

    let explicit = store.get_explicit_share(folder.id, user).await.unwrap();
    assert_eq!(explicit.map(|s| s.role), Some(Role::Editor));
    assert!(
        store
            .get_explicit_share(folder.id, Uuid::new_v4())
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn upsert_share_rejects_none_role() {
    let store = setup().await;
    let err = store
        .upsert_share(Uuid::new_v4(), Uuid::new_v4(), Role::None)
        .await
        .unwrap_err();
    assert!(matches!(err, FolioError::Validation { .. }));
}

#[tokio::test]
async fn delete_share_removes_and_reports_missing() {
    let store = setup().await;
    let resource = Uuid::new_v4();
    let user = Uuid::new_v4();
    let share = store.upsert_share(resource, user, Role::Viewer).await.unwrap();

    assert_eq!(store.list_shares_for_user(user).await.unwrap().len(), 1);

    store.delete_share(share.id).await.unwrap();
    assert!(store.list_shares_for_user(user).await.unwrap().is_empty());

    let err = store.delete_share(share.id).await.unwrap_err();
    assert!(matches!(err, FolioError::NotFound { .. }));
    let err = store.get_share(share.id).await.unwrap_err();
    assert!(matches!(err, FolioError::NotFound { .. }));
}

#[tokio::test]
async fn rejected_share_statement_is_a_database_error() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    folio_db::run_migrations(&db).await.unwrap();
    let store = SurrealGrantStore::new(db.clone());
    let resource = Uuid::new_v4();
    let user = Uuid::new_v4();

    // Same pair under another record id, so the keyed upsert trips the
    // unique pair index.
    db.query("CREATE share:stray SET resource_id = $resource_id, user_id = $user_id, role = 'viewer'")
        .bind(("resource_id", resource.to_string()))
        .bind(("user_id", user.to_string()))
        .await
        .unwrap()
        .check()
        .unwrap();

    let err = store.upsert_share(resource, user, Role::Editor).await.unwrap_err();
    match err {
        FolioError::Database(message) => {
            assert!(message.starts_with("SurrealDB error"), "{message}");
            assert!(!message.contains("Migration"), "{message}");
        }
        other => panic!("expected a database error, got {other:?}"),
    }
}
