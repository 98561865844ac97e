//! Panorama completeness, de-duplication and forest reconstruction.

use std::collections::{HashMap, HashSet};

use folio_access::test_utils::{InMemoryDirectory, InMemoryGrantStore, fixture};
use folio_core::error::FolioError;
use folio_core::models::grant::GrantSource;
use folio_core::models::resource::{CreateResource, Resource, SpaceType};
use folio_core::models::role::{DepartmentGrade, Role};
use folio_core::repository::GrantStore;
use uuid::Uuid;

struct World {
    user: Uuid,
    admin: Uuid,
    sales_folder: Resource,
    board: Resource,
    minutes: Resource,
}

fn world(store: &InMemoryGrantStore, directory: &InMemoryDirectory) -> World {
    let user = Uuid::new_v4();
    let admin = Uuid::new_v4();
    let company = directory.add_department("Company", None);
    let sales = directory.add_department("Sales", Some(company));
    let support = directory.add_department("Support", Some(company));
    let project = Uuid::new_v4();
    directory.assign(user, sales, DepartmentGrade::Member);
    directory.add_project_member(project, user, Role::Viewer);

    let dept_root = store.seed(CreateResource::folder("Departments", SpaceType::Department, None));
    let project_root = store.seed(CreateResource::folder("Projects", SpaceType::Project, None));
    let library = store.seed(CreateResource::folder("Library", SpaceType::Public, None));
    store.seed(CreateResource::document("Welcome", SpaceType::Public, library.id));

    let company_folder = store.seed(CreateResource {
        department_id: Some(company),
        ..CreateResource::folder("Company", SpaceType::Department, Some(dept_root.id))
    });
    let sales_folder = store.seed(CreateResource {
        department_id: Some(sales),
        owner_id: Some(admin),
        ..CreateResource::folder("Sales", SpaceType::Department, Some(company_folder.id))
    });
    store.seed(CreateResource {
        department_id: Some(sales),
        ..CreateResource::document("Forecast", SpaceType::Department, sales_folder.id)
    });
    store.seed(CreateResource {
        department_id: Some(support),
        ..CreateResource::folder("Support", SpaceType::Department, Some(company_folder.id))
    });
    let board = store.seed(CreateResource {
        department_id: Some(company),
        owner_id: Some(admin),
        restricted: true,
        ..CreateResource::folder("Board", SpaceType::Department, Some(company_folder.id))
    });
    let minutes = store.seed(CreateResource {
        department_id: Some(company),
        owner_id: Some(admin),
        restricted: true,
        ..CreateResource::document("Minutes", SpaceType::Department, board.id)
    });
    let apollo = store.seed(CreateResource {
        project_id: Some(project),
        ..CreateResource::folder("Apollo", SpaceType::Project, Some(project_root.id))
    });
    store.seed(CreateResource {
        project_id: Some(project),
        ..CreateResource::document("Plan", SpaceType::Project, apollo.id)
    });
    store.seed(CreateResource::folder("Hermes", SpaceType::Project, Some(project_root.id)));

    World {
        user,
        admin,
        sales_folder,
        board,
        minutes,
    }
}

#[tokio::test]
async fn panorama_matches_per_resource_resolution() {
    let (service, store, directory) = fixture();
    let w = world(&store, &directory);
    service
        .share(w.admin, w.minutes.id, w.user, Role::Viewer)
        .await
        .unwrap();

    let panorama = service.build_panorama(w.user).await.unwrap();
    assert!(panorama.omitted.is_empty());
    assert!(panorama.warnings.is_empty());

    let mut listed: HashMap<Uuid, Role> = HashMap::new();
    for entry in &panorama.entries {
        assert!(
            listed.insert(entry.resource.id, entry.role).is_none(),
            "{} listed twice",
            entry.resource.name
        );
    }

    let mut expected: HashMap<Uuid, Role> = HashMap::new();
    for resource in store.list_all_resources().await.unwrap() {
        let result = service.resolve(resource.id, w.user).await.unwrap();
        if result.is_visible() {
            expected.insert(resource.id, result.role);
        }
    }
    assert_eq!(listed, expected);
    assert!(!listed.contains_key(&w.board.id));
}

#[tokio::test]
async fn share_and_membership_collapse_into_one_entry() {
    let (service, store, directory) = fixture();
    let w = world(&store, &directory);
    let share = service
        .share(w.admin, w.sales_folder.id, w.user, Role::Editor)
        .await
        .unwrap();

    let panorama = service.build_panorama(w.user).await.unwrap();
    let entries: Vec<_> = panorama
        .entries
        .iter()
        .filter(|e| e.resource.id == w.sales_folder.id)
        .collect();
    assert_eq!(entries.len(), 1);

    let entry = entries[0];
    assert_eq!(entry.role, Role::Editor);
    assert_eq!(entry.share_id, Some(share.id));
    assert!(entry.revocable);
    let kinds: HashSet<&str> = entry.sources.iter().map(|c| c.source.kind()).collect();
    assert!(kinds.contains("explicit_share"));
    assert!(kinds.contains("department"));
}

#[tokio::test]
async fn implicit_entries_are_inherited_and_carry_ancestors() {
    let (service, store, directory) = fixture();
    let w = world(&store, &directory);

    let panorama = service.build_panorama(w.user).await.unwrap();
    let entry = panorama
        .entries
        .iter()
        .find(|e| e.resource.id == w.sales_folder.id)
        .unwrap();
    assert!(entry.inherited);
    assert!(!entry.revocable);
    let names: Vec<&str> = entry.ancestors.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["Departments", "Company"]);

    // Entries closer to a root come first.
    let depths: Vec<usize> = panorama.entries.iter().map(|e| e.ancestors.len()).collect();
    let mut sorted = depths.clone();
    sorted.sort();
    assert_eq!(depths, sorted);
}

#[tokio::test]
async fn hidden_ancestor_turns_descendant_into_synthetic_root() {
    let (service, store, directory) = fixture();
    let w = world(&store, &directory);
    service
        .share(w.admin, w.minutes.id, w.user, Role::Viewer)
        .await
        .unwrap();

    let panorama = service.build_panorama(w.user).await.unwrap();
    let forest = panorama.forest();
    let minutes = forest
        .nodes
        .iter()
        .position(|n| n.id == w.minutes.id)
        .unwrap();
    assert!(forest.roots.contains(&minutes));
    assert!(forest.nodes[minutes].synthetic_root);

    // Every entry shows up exactly once when walking the forest.
    let walked: Vec<usize> = forest.depth_first().into_iter().map(|(_, n)| n).collect();
    assert_eq!(walked.len(), panorama.entries.len());
    let unique: HashSet<usize> = walked.iter().copied().collect();
    assert_eq!(unique.len(), walked.len());
}

#[tokio::test]
async fn super_admin_sees_everything() {
    let (service, store, directory) = fixture();
    let w = world(&store, &directory);
    let root_user = Uuid::new_v4();
    directory.set_super_admin(root_user);

    let panorama = service.build_panorama(root_user).await.unwrap();
    let all = store.list_all_resources().await.unwrap();
    assert_eq!(panorama.entries.len(), all.len());
    let board = panorama
        .entries
        .iter()
        .find(|e| e.resource.id == w.board.id)
        .unwrap();
    assert_eq!(board.role, Role::Admin);
    assert_eq!(board.sources[0].source, GrantSource::SuperAdmin);
}

#[tokio::test]
async fn parent_cycle_rejects_the_panorama() {
    let (service, store, _directory) = fixture();
    let user = Uuid::new_v4();
    let a = store.seed(CreateResource {
        owner_id: Some(user),
        ..CreateResource::folder("A", SpaceType::Project, None)
    });
    let b = store.seed(CreateResource {
        owner_id: Some(user),
        ..CreateResource::folder("B", SpaceType::Project, Some(a.id))
    });
    store.insert_raw(Resource {
        parent_id: Some(b.id),
        ..a
    });

    let err = service.build_panorama(user).await.unwrap_err();
    assert!(matches!(err, FolioError::InvariantViolation(_)));
}

#[tokio::test]
async fn unreachable_ancestor_is_omitted() {
    let (service, store, _directory) = fixture();
    let user = Uuid::new_v4();
    let root = store.seed(CreateResource::folder("Projects", SpaceType::Project, None));
    let folder = store.seed(CreateResource {
        owner_id: Some(user),
        ..CreateResource::folder("Lost", SpaceType::Project, Some(Uuid::new_v4()))
    });

    let panorama = service.build_panorama(user).await.unwrap();
    assert!(panorama.entries.iter().any(|e| e.resource.id == root.id));
    assert!(!panorama.entries.iter().any(|e| e.resource.id == folder.id));
    assert_eq!(panorama.omitted[0].resource_id, folder.id);
}

#[tokio::test]
async fn degraded_ancestor_fetch_keeps_the_entry() {
    let (service, store, directory) = fixture();
    let user = Uuid::new_v4();
    let project = Uuid::new_v4();
    directory.add_project_member(project, user, Role::Editor);
    let root = store.seed(CreateResource::folder("Projects", SpaceType::Project, None));
    let alpha = store.seed(CreateResource::folder("Alpha", SpaceType::Project, Some(root.id)));
    let plans = store.seed(CreateResource {
        project_id: Some(project),
        ..CreateResource::folder("Plans", SpaceType::Project, Some(alpha.id))
    });
    store.faults.make_unavailable("get_resources");

    let resolved = service.resolve(plans.id, user).await.unwrap();
    assert_eq!(resolved.role, Role::Editor);

    let panorama = service.build_panorama(user).await.unwrap();
    let entry = panorama
        .entries
        .iter()
        .find(|e| e.resource.id == plans.id)
        .expect("granted resource stays in the panorama");
    assert_eq!(entry.role, Role::Editor);
    assert!(entry.ancestors.is_empty());
    assert!(panorama.omitted.is_empty());
    assert!(!panorama.warnings.is_empty());

    let forest = panorama.forest();
    let index = panorama
        .entries
        .iter()
        .position(|e| e.resource.id == plans.id)
        .unwrap();
    assert!(forest.roots.contains(&index));
    assert!(forest.nodes[index].synthetic_root);
}
