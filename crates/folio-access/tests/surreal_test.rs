//! The engine over the SurrealDB-backed store and directory.

use folio_access::{AccessConfig, AccessService};
use folio_core::error::FolioError;
use folio_core::models::resource::{CreateResource, SpaceType, UpdateResource};
use folio_core::models::role::{DepartmentGrade, Role};
use folio_core::repository::GrantStore;
use folio_db::repository::{SurrealGrantStore, SurrealMembershipProvider};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

type Service = AccessService<SurrealGrantStore<Db>, SurrealMembershipProvider<Db>>;

async fn setup() -> (Service, SurrealGrantStore<Db>, SurrealMembershipProvider<Db>) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    folio_db::run_migrations(&db).await.unwrap();
    let store = SurrealGrantStore::new(db.clone());
    let directory = SurrealMembershipProvider::new(db.clone());
    let service = AccessService::new(
        SurrealGrantStore::new(db.clone()),
        SurrealMembershipProvider::new(db),
        AccessConfig::default(),
    );
    (service, store, directory)
}

#[tokio::test]
async fn department_scenario_end_to_end() {
    let (service, store, directory) = setup().await;
    let company = directory.create_department("Company", None).await.unwrap();
    let sales = directory
        .create_department("Sales", Some(company.id))
        .await
        .unwrap();
    let support = directory
        .create_department("Support", Some(company.id))
        .await
        .unwrap();
    let rep = Uuid::new_v4();
    let admin = Uuid::new_v4();
    directory
        .assign_user(rep, Some(sales.id), DepartmentGrade::Member)
        .await
        .unwrap();

    let root = store
        .create_resource(CreateResource::folder(
            "Departments",
            SpaceType::Department,
            None,
        ))
        .await
        .unwrap();
    let company_folder = store
        .create_resource(CreateResource {
            department_id: Some(company.id),
            owner_id: Some(admin),
            ..CreateResource::folder("Company", SpaceType::Department, Some(root.id))
        })
        .await
        .unwrap();
    let sales_folder = store
        .create_resource(CreateResource {
            department_id: Some(sales.id),
            owner_id: Some(admin),
            ..CreateResource::folder("Sales", SpaceType::Department, Some(company_folder.id))
        })
        .await
        .unwrap();
    let support_folder = store
        .create_resource(CreateResource {
            department_id: Some(support.id),
            ..CreateResource::folder("Support", SpaceType::Department, Some(company_folder.id))
        })
        .await
        .unwrap();

    let listing = service
        .list_visible_children(company_folder.id, rep)
        .await
        .unwrap();
    assert!(listing.isolated);
    let ids: Vec<Uuid> = listing.children.iter().map(|c| c.resource.id).collect();
    assert_eq!(ids, vec![sales_folder.id]);

    store
        .update_resource(
            sales_folder.id,
            UpdateResource {
                restricted: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(
        service.resolve(sales_folder.id, rep).await.unwrap().role,
        Role::None
    );

    let err = service
        .share(admin, support_folder.id, rep, Role::Editor)
        .await
        .unwrap_err();
    assert!(matches!(err, FolioError::Forbidden { .. }));

    let share = service
        .share(admin, sales_folder.id, rep, Role::Editor)
        .await
        .unwrap();
    assert_eq!(
        service.resolve(sales_folder.id, rep).await.unwrap().role,
        Role::Editor
    );

    let panorama = service.build_panorama(rep).await.unwrap();
    let entry = panorama
        .entries
        .iter()
        .find(|e| e.resource.id == sales_folder.id)
        .unwrap();
    assert_eq!(entry.share_id, Some(share.id));
    let names: Vec<&str> = entry.ancestors.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["Departments", "Company"]);

    service.revoke_share(admin, share.id).await.unwrap();
    assert_eq!(
        service.resolve(sales_folder.id, rep).await.unwrap().role,
        Role::None
    );
}

#[tokio::test]
async fn project_roster_from_surreal() {
    let (service, store, directory) = setup().await;
    let project = Uuid::new_v4();
    let lead = Uuid::new_v4();
    let guest = Uuid::new_v4();
    directory
        .add_project_member(project, lead, Role::Admin)
        .await
        .unwrap();
    directory
        .add_project_member(project, guest, Role::Viewer)
        .await
        .unwrap();

    let root = store
        .create_resource(CreateResource::folder("Projects", SpaceType::Project, None))
        .await
        .unwrap();
    let folder = store
        .create_resource(CreateResource {
            project_id: Some(project),
            ..CreateResource::folder("Apollo", SpaceType::Project, Some(root.id))
        })
        .await
        .unwrap();

    let roster = service.list_members(folder.id).await.unwrap();
    let members: Vec<(Uuid, Role)> = roster.members.iter().map(|m| (m.user_id, m.role)).collect();
    assert_eq!(members, vec![(lead, Role::Admin), (guest, Role::Viewer)]);

    assert_eq!(
        service.resolve(folder.id, guest).await.unwrap().role,
        Role::Viewer
    );
    directory.remove_project_member(project, guest).await.unwrap();
    assert_eq!(
        service.resolve(folder.id, guest).await.unwrap().role,
        Role::None
    );
}
