use std::sync::Arc;

use catalog_domain::{Category, CategoryId, CategoryName, HierarchyViolation, ProductId, TreeError};
use chrono::{DateTime, Duration, TimeZone, Utc};

use super::*;
use crate::infrastructure::clock::FixedClock;
use crate::infrastructure::memory::{InMemoryCategoryRepo, InMemoryProductCounts};
use crate::infrastructure::ports::{
    CategoryRepo, MockCategoryRepo, MockClockPort, MockProductCountRepo, RepoError,
};

fn now() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap()
}

struct Harness {
    catalog: CategoryHierarchy,
    store: InMemoryCategoryRepo,
    products: InMemoryProductCounts,
}

fn harness() -> Harness {
    harness_with(InMemoryCategoryRepo::new())
}

fn harness_with(store: InMemoryCategoryRepo) -> Harness {
    let products = InMemoryProductCounts::for_store(&store);
    let catalog = CategoryHierarchy::new(
        Arc::new(store.clone()),
        Arc::new(products.clone()),
        Arc::new(FixedClock(now())),
    );
    Harness {
        catalog,
        store,
        products,
    }
}

impl Harness {
    async fn create(&self, name: &str, parent: Option<&Category>) -> Category {
        let mut input = NewCategory::new(name);
        if let Some(parent) = parent {
            input = input.with_parent(parent.id());
        }
        self.catalog.create(input).await.expect("create category")
    }

    async fn stored(&self, id: CategoryId) -> Category {
        self.store
            .get(id)
            .await
            .expect("get")
            .expect("category should exist")
    }
}

fn rejection(error: CatalogError) -> HierarchyViolation {
    match error {
        CatalogError::Rejected(violation) => violation,
        other => panic!("expected a rejection, got {other:?}"),
    }
}

fn seeded(name: &str, parent: Option<&Category>, level: u8) -> Category {
    Category::new(CategoryName::new(name).unwrap(), now())
        .with_placement(parent.map(Category::id), level)
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn create_assigns_levels_from_the_parent() {
    let h = harness();
    let baseball = h.create("Baseball", None).await;
    let bats = h.create("Bats", Some(&baseball)).await;
    let wood = h.create("Wood Bats", Some(&bats)).await;

    assert_eq!(baseball.level(), 0);
    assert_eq!(baseball.parent_id(), None);
    assert_eq!(bats.level(), 1);
    assert_eq!(bats.parent_id(), Some(baseball.id()));
    assert_eq!(wood.level(), 2);
    assert_eq!(wood.created_at(), now());
    assert_eq!(h.catalog.get_all().await.unwrap().len(), 3);
}

#[tokio::test]
async fn create_below_the_deepest_level_is_rejected() {
    let h = harness();
    let baseball = h.create("Baseball", None).await;
    let bats = h.create("Bats", Some(&baseball)).await;
    let wood = h.create("Wood Bats", Some(&bats)).await;

    let error = h
        .catalog
        .create(NewCategory::new("Maple").with_parent(wood.id()))
        .await
        .unwrap_err();

    assert!(error.is_business());
    assert_eq!(
        rejection(error),
        HierarchyViolation::DepthLimitExceeded {
            parent_id: Some(wood.id()),
            resulting_level: 3,
        }
    );
    assert_eq!(h.catalog.get_all().await.unwrap().len(), 3);
}

#[tokio::test]
async fn duplicate_names_are_rejected_case_insensitively() {
    let h = harness();
    let shoes = h.create("Shoes", None).await;

    let error = h
        .catalog
        .create(NewCategory::new("shoes"))
        .await
        .unwrap_err();

    assert_eq!(
        rejection(error),
        HierarchyViolation::DuplicateName {
            name: "shoes".to_string(),
            existing_id: shoes.id(),
        }
    );
}

#[tokio::test]
async fn create_validates_input_and_parent() {
    let h = harness();

    let blank = h.catalog.create(NewCategory::new("   ")).await.unwrap_err();
    assert!(matches!(
        rejection(blank),
        HierarchyViolation::InvalidInput(_)
    ));

    let too_long = h
        .catalog
        .create(NewCategory::new("Hats").with_description("x".repeat(501)))
        .await
        .unwrap_err();
    assert_eq!(rejection(too_long).kind(), "invalid_input");

    let missing = CategoryId::new();
    let orphan = h
        .catalog
        .create(NewCategory::new("Orphans").with_parent(missing))
        .await
        .unwrap_err();
    assert_eq!(
        rejection(orphan),
        HierarchyViolation::ParentNotFound { parent_id: missing }
    );
}

#[tokio::test]
async fn create_keeps_description_and_sort_order() {
    let h = harness();
    let created = h
        .catalog
        .create(
            NewCategory::new("  Helmets  ")
                .with_description("  Batting helmets ")
                .with_sort_order(7),
        )
        .await
        .unwrap();

    assert_eq!(created.name().as_str(), "Helmets");
    assert_eq!(
        created.description().map(|d| d.as_str()),
        Some("Batting helmets")
    );
    assert_eq!(created.sort_order(), 7);
    assert_eq!(h.stored(created.id()).await, created);

    let blank = h
        .catalog
        .create(NewCategory::new("Visors").with_description("   "))
        .await
        .unwrap();
    assert!(blank.description().is_none());
}

// =============================================================================
// Rename / description / sort order
// =============================================================================

#[tokio::test]
async fn rename_checks_other_names_but_not_its_own() {
    let h = harness();
    let shoes = h.create("Shoes", None).await;
    let boots = h.create("Boots", None).await;

    let error = h.catalog.rename(boots.id(), "SHOES").await.unwrap_err();
    assert!(matches!(
        rejection(error),
        HierarchyViolation::DuplicateName { existing_id, .. } if existing_id == shoes.id()
    ));

    let renamed = h.catalog.rename(shoes.id(), "SHOES").await.unwrap();
    assert_eq!(renamed.name().as_str(), "SHOES");
    assert_eq!(h.stored(shoes.id()).await.name().as_str(), "SHOES");

    let missing = CategoryId::new();
    assert_eq!(
        rejection(h.catalog.rename(missing, "Sandals").await.unwrap_err()),
        HierarchyViolation::NotFound {
            category_id: missing
        }
    );
}

#[tokio::test]
async fn description_can_be_set_and_cleared() {
    let h = harness();
    let gloves = h.create("Gloves", None).await;

    let updated = h
        .catalog
        .update_description(gloves.id(), Some("Leather".to_string()))
        .await
        .unwrap();
    assert_eq!(updated.description().map(|d| d.as_str()), Some("Leather"));

    let cleared = h
        .catalog
        .update_description(gloves.id(), Some(" ".to_string()))
        .await
        .unwrap();
    assert!(cleared.description().is_none());
    assert!(h.stored(gloves.id()).await.description().is_none());
}

#[tokio::test]
async fn sort_order_changes_sibling_order() {
    let h = harness();
    let soccer = h.create("Soccer", None).await;
    h.create("Baseball", None).await;

    h.catalog.set_sort_order(soccer.id(), -1).await.unwrap();

    let names: Vec<String> = h
        .catalog
        .children_of(None)
        .await
        .unwrap()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    assert_eq!(names, vec!["Soccer", "Baseball"]);
}

// =============================================================================
// Reparent
// =============================================================================

#[tokio::test]
async fn reparent_under_own_descendant_is_rejected() {
    let h = harness();
    let a = h.create("A", None).await;
    let b = h.create("B", Some(&a)).await;

    let error = h.catalog.reparent(a.id(), Some(b.id())).await.unwrap_err();
    assert_eq!(
        rejection(error),
        HierarchyViolation::CircularReference {
            category_id: a.id(),
            proposed_parent_id: b.id(),
        }
    );

    let onto_self = h.catalog.reparent(a.id(), Some(a.id())).await.unwrap_err();
    assert_eq!(rejection(onto_self).kind(), "circular_reference");
    assert_eq!(h.stored(a.id()).await.parent_id(), None);
}

#[tokio::test]
async fn reparent_rewrites_levels_of_the_whole_subtree() {
    let h = harness();
    let sports = h.create("Sports", None).await;
    let outdoor = h.create("Outdoor", None).await;
    let balls = h.create("Balls", Some(&sports)).await;
    let footballs = h.create("Footballs", Some(&balls)).await;

    let moved = h.catalog.reparent(balls.id(), None).await.unwrap();
    assert_eq!(moved.level(), 0);
    assert_eq!(moved.parent_id(), None);
    assert_eq!(h.stored(footballs.id()).await.level(), 1);

    h.catalog.reparent(balls.id(), Some(outdoor.id())).await.unwrap();
    assert_eq!(h.stored(balls.id()).await.level(), 1);
    assert_eq!(h.stored(footballs.id()).await.level(), 2);
    assert_eq!(
        h.catalog.full_path_of(footballs.id()).await.unwrap(),
        "Outdoor > Balls > Footballs"
    );
    assert!(h.catalog.audit().await.unwrap().is_healthy());
}

#[tokio::test]
async fn reparent_that_pushes_descendants_too_deep_is_rejected() {
    let h = harness();
    let a = h.create("A", None).await;
    let b = h.create("B", Some(&a)).await;
    let x = h.create("X", None).await;
    let y = h.create("Y", Some(&x)).await;

    h.create("C", Some(&b)).await;

    // A carries two levels below it, so under Y its deepest node lands on 4
    let error = h.catalog.reparent(a.id(), Some(y.id())).await.unwrap_err();
    assert_eq!(
        rejection(error),
        HierarchyViolation::DepthLimitExceeded {
            parent_id: Some(y.id()),
            resulting_level: 4,
        }
    );

    let error = h.catalog.reparent(b.id(), Some(y.id())).await.unwrap_err();
    assert!(matches!(
        rejection(error),
        HierarchyViolation::DepthLimitExceeded {
            resulting_level: 3,
            ..
        }
    ));
    assert_eq!(h.stored(b.id()).await.parent_id(), Some(a.id()));
}

#[tokio::test]
async fn reparent_checks_both_ends_exist() {
    let h = harness();
    let a = h.create("A", None).await;
    let missing = CategoryId::new();

    assert_eq!(
        rejection(h.catalog.reparent(missing, Some(a.id())).await.unwrap_err()),
        HierarchyViolation::NotFound {
            category_id: missing
        }
    );
    assert_eq!(
        rejection(h.catalog.reparent(a.id(), Some(missing)).await.unwrap_err()),
        HierarchyViolation::ParentNotFound { parent_id: missing }
    );
}

// =============================================================================
// Combined update
// =============================================================================

#[tokio::test]
async fn combined_update_applies_every_change() {
    let h = harness();
    let soccer = h.create("Soccer", None).await;
    let balls = h.create("Balls", None).await;

    let updated = h
        .catalog
        .update(
            balls.id(),
            CategoryChanges {
                name: Some("Soccer Balls".to_string()),
                description: Some(Some("Size 5".to_string())),
                parent_id: Some(Some(soccer.id())),
                sort_order: Some(3),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name().as_str(), "Soccer Balls");
    assert_eq!(updated.description().map(|d| d.as_str()), Some("Size 5"));
    assert_eq!(updated.parent_id(), Some(soccer.id()));
    assert_eq!(updated.level(), 1);
    assert_eq!(updated.sort_order(), 3);
    assert_eq!(h.stored(balls.id()).await, updated);
}

#[tokio::test]
async fn combined_update_is_all_or_nothing() {
    let h = harness();
    let soccer = h.create("Soccer", None).await;
    let balls = h.create("Balls", None).await;

    let error = h
        .catalog
        .update(
            balls.id(),
            CategoryChanges {
                name: Some("SOCCER".to_string()),
                parent_id: Some(Some(soccer.id())),
                ..CategoryChanges::default()
            },
        )
        .await
        .unwrap_err();

    assert_eq!(rejection(error).kind(), "duplicate_name");
    assert_eq!(h.stored(balls.id()).await, balls);
}

#[tokio::test]
async fn empty_update_returns_the_category_untouched() {
    let h = harness();
    let soccer = h.create("Soccer", None).await;

    let same = h
        .catalog
        .update(soccer.id(), CategoryChanges::default())
        .await
        .unwrap();
    assert_eq!(same, soccer);
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn delete_requires_a_childless_category() {
    let h = harness();
    let gloves = h.create("Gloves", None).await;
    let mitts = h.create("Catcher's Mitts", Some(&gloves)).await;

    let error = h.catalog.delete(gloves.id()).await.unwrap_err();
    assert_eq!(
        rejection(error),
        HierarchyViolation::HasChildren {
            category_id: gloves.id(),
            child_count: 1,
        }
    );

    h.catalog.delete(mitts.id()).await.unwrap();
    h.catalog.delete(gloves.id()).await.unwrap();

    let remaining = h.catalog.get_all().await.unwrap();
    assert!(remaining.is_empty());
    assert!(h.catalog.get_by_id(gloves.id()).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_is_blocked_by_attached_products() {
    let h = harness();
    let bats = h.create("Bats", None).await;
    let product = ProductId::new();
    h.products.attach(product, bats.id()).await.unwrap();

    let error = h.catalog.delete(bats.id()).await.unwrap_err();
    assert_eq!(
        rejection(error),
        HierarchyViolation::HasAssociatedProducts {
            category_id: bats.id(),
            product_count: 1,
        }
    );

    h.products.detach(product).await;
    h.catalog.delete(bats.id()).await.unwrap();
}

#[tokio::test]
async fn delete_unknown_category_is_not_found() {
    let h = harness();
    let missing = CategoryId::new();
    assert_eq!(
        rejection(h.catalog.delete(missing).await.unwrap_err()),
        HierarchyViolation::NotFound {
            category_id: missing
        }
    );
}

// =============================================================================
// Queries
// =============================================================================

#[tokio::test]
async fn select_items_are_depth_first_in_sibling_order() {
    let h = harness();
    let soccer = h
        .catalog
        .create(NewCategory::new("Soccer").with_sort_order(1))
        .await
        .unwrap();
    let baseball = h
        .catalog
        .create(NewCategory::new("Baseball").with_sort_order(2))
        .await
        .unwrap();
    let balls = h.create("Balls", Some(&soccer)).await;

    let items = h.catalog.build_select_items().await.unwrap();
    let summary: Vec<(CategoryId, u8)> = items.iter().map(|i| (i.id, i.level)).collect();
    assert_eq!(
        summary,
        vec![(soccer.id(), 0), (balls.id(), 1), (baseball.id(), 0)]
    );
    assert_eq!(items[1].name, "Balls");
    assert_eq!(items[1].full_path, "Soccer > Balls");
    assert_eq!(items[2].full_path, "Baseball");
}

#[tokio::test]
async fn ties_in_sort_order_fall_back_to_name() {
    let h = harness();
    h.create("beta", None).await;
    h.create("Gamma", None).await;
    h.create("Alpha", None).await;

    let names: Vec<String> = h
        .catalog
        .build_select_items()
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.name)
        .collect();
    // Ordinal comparison puts uppercase first
    assert_eq!(names, vec!["Alpha", "Gamma", "beta"]);
}

#[tokio::test]
async fn paths_and_ancestors_run_root_to_leaf() {
    let h = harness();
    let soccer = h.create("Soccer", None).await;
    let balls = h.create("Balls", Some(&soccer)).await;

    assert_eq!(h.catalog.full_path_of(balls.id()).await.unwrap(), "Soccer > Balls");
    assert_eq!(h.catalog.full_path_of(soccer.id()).await.unwrap(), "Soccer");

    let chain: Vec<CategoryId> = h
        .catalog
        .ancestors_of(balls.id())
        .await
        .unwrap()
        .iter()
        .map(Category::id)
        .collect();
    assert_eq!(chain, vec![soccer.id(), balls.id()]);

    let missing = CategoryId::new();
    assert_eq!(
        rejection(h.catalog.ancestors_of(missing).await.unwrap_err()).kind(),
        "not_found"
    );
}

#[tokio::test]
async fn children_and_descendants() {
    let h = harness();
    let soccer = h.create("Soccer", None).await;
    let balls = h.create("Balls", Some(&soccer)).await;
    let nets = h.create("Nets", Some(&soccer)).await;
    let training = h.create("Training Balls", Some(&balls)).await;

    let children: Vec<CategoryId> = h
        .catalog
        .children_of(Some(soccer.id()))
        .await
        .unwrap()
        .iter()
        .map(Category::id)
        .collect();
    assert_eq!(children, vec![balls.id(), nets.id()]);

    let descendants: Vec<CategoryId> = h
        .catalog
        .descendants_of(soccer.id())
        .await
        .unwrap()
        .iter()
        .map(Category::id)
        .collect();
    assert_eq!(descendants, vec![balls.id(), nets.id(), training.id()]);

    assert!(h.catalog.descendants_of(nets.id()).await.unwrap().is_empty());
    assert!(h
        .catalog
        .children_of(Some(CategoryId::new()))
        .await
        .is_err());
}

#[tokio::test]
async fn name_availability_follows_uniqueness_rule() {
    let h = harness();
    let shoes = h.create("Shoes", None).await;

    assert!(!h.catalog.is_name_available("SHOES", None).await.unwrap());
    assert!(h.catalog.is_name_available("shoes", Some(shoes.id())).await.unwrap());
    assert!(h.catalog.is_name_available("Boots", None).await.unwrap());
    assert!(h.catalog.is_name_available("", None).await.is_err());
}

// =============================================================================
// Audit and repair
// =============================================================================

#[tokio::test]
async fn repair_levels_fixes_stale_rows() {
    let root = seeded("Root", None, 0);
    let child = seeded("Child", Some(&root), 2);
    let grandchild = seeded("Grandchild", Some(&child), 0);
    let h = harness_with(InMemoryCategoryRepo::with_categories([
        root.clone(),
        child.clone(),
        grandchild.clone(),
    ]));

    let report = h.catalog.audit().await.unwrap();
    assert!(!report.is_healthy());
    assert_eq!(report.total, 3);
    assert_eq!(report.stale_levels.len(), 2);

    assert_eq!(h.catalog.repair_levels().await.unwrap(), 2);
    assert_eq!(h.stored(child.id()).await.level(), 1);
    assert_eq!(h.stored(grandchild.id()).await.level(), 2);
    assert!(h.catalog.audit().await.unwrap().is_healthy());
    assert_eq!(h.catalog.repair_levels().await.unwrap(), 0);
}

#[tokio::test]
async fn cyclic_data_is_reported_as_corruption() {
    let a_id = CategoryId::new();
    let b = seeded("B", None, 1).with_placement(Some(a_id), 1);
    let a = seeded("A", None, 1).with_id(a_id).with_placement(Some(b.id()), 1);
    let h = harness_with(InMemoryCategoryRepo::with_categories([a.clone(), b]));

    let error = h.catalog.full_path_of(a.id()).await.unwrap_err();
    assert!(!error.is_business());
    assert!(matches!(
        error,
        CatalogError::CorruptTree(TreeError::CycleDetected(_))
    ));

    // Neither node is reachable from a root
    assert!(h.catalog.build_select_items().await.unwrap().is_empty());
    assert!(!h.catalog.audit().await.unwrap().cycles.is_empty());
}

// =============================================================================
// Concurrent mutations
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_reparents_cannot_form_a_cycle() {
    let h = harness();
    let a = h.create("A", None).await;
    let b = h.create("B", None).await;

    let (a_under_b, b_under_a) = tokio::join!(
        h.catalog.reparent(a.id(), Some(b.id())),
        h.catalog.reparent(b.id(), Some(a.id())),
    );

    let loser = match (a_under_b, b_under_a) {
        (Ok(_), Err(error)) | (Err(error), Ok(_)) => error,
        other => panic!("expected exactly one reparent to win, got {other:?}"),
    };
    assert_eq!(rejection(loser).kind(), "circular_reference");
    assert!(h.catalog.audit().await.unwrap().cycles.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_unrelated_creates_both_succeed() {
    let h = harness();
    let (shoes, helmets) = tokio::join!(
        h.catalog.create(NewCategory::new("Shoes")),
        h.catalog.create(NewCategory::new("Helmets")),
    );
    shoes.unwrap();
    helmets.unwrap();
    assert_eq!(h.catalog.get_all().await.unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_creates_reject_one() {
    let h = harness();
    let (first, second) = tokio::join!(
        h.catalog.create(NewCategory::new("Gloves")),
        h.catalog.create(NewCategory::new("GLOVES")),
    );

    let loser = match (first, second) {
        (Ok(_), Err(error)) | (Err(error), Ok(_)) => error,
        other => panic!("expected exactly one create to win, got {other:?}"),
    };
    assert_eq!(rejection(loser).kind(), "duplicate_name");
}

// =============================================================================
// Port failures
// =============================================================================

#[tokio::test]
async fn store_failure_on_begin_surfaces_as_repo_error() {
    let mut categories = MockCategoryRepo::new();
    categories
        .expect_begin()
        .returning(|| Err(RepoError::database("category_begin", "database is locked")));
    let mut clock = MockClockPort::new();
    clock.expect_now().return_const(now());

    let catalog = CategoryHierarchy::new(
        Arc::new(categories),
        Arc::new(MockProductCountRepo::new()),
        Arc::new(clock),
    );

    let error = catalog
        .create(NewCategory::new("Shoes"))
        .await
        .unwrap_err();
    assert!(!error.is_business());
    assert!(matches!(
        error,
        CatalogError::Repo(RepoError::Database { operation: "category_begin", .. })
    ));
}

#[tokio::test]
async fn store_failure_on_read_surfaces_as_repo_error() {
    let mut categories = MockCategoryRepo::new();
    categories
        .expect_list_all()
        .returning(|| Err(RepoError::database("category_list_all", "disk I/O error")));

    let catalog = CategoryHierarchy::new(
        Arc::new(categories),
        Arc::new(MockProductCountRepo::new()),
        Arc::new(FixedClock(now())),
    );

    assert!(matches!(
        catalog.build_select_items().await,
        Err(CatalogError::Repo(_))
    ));
    assert!(matches!(catalog.audit().await, Err(CatalogError::Repo(_))));
}

#[tokio::test]
async fn product_count_failure_aborts_delete() {
    let store = InMemoryCategoryRepo::new();
    let seed = CategoryHierarchy::new(
        Arc::new(store.clone()),
        Arc::new(InMemoryProductCounts::for_store(&store)),
        Arc::new(FixedClock(now())),
    );
    let bats = seed.create(NewCategory::new("Bats")).await.unwrap();

    let mut products = MockProductCountRepo::new();
    products
        .expect_count_for_category()
        .returning(|_| Err(RepoError::database("count_products", "no such table")));
    let catalog = CategoryHierarchy::new(
        Arc::new(store.clone()),
        Arc::new(products),
        Arc::new(FixedClock(now())),
    );

    assert!(matches!(
        catalog.delete(bats.id()).await,
        Err(CatalogError::Repo(_))
    ));
    assert!(store.get(bats.id()).await.unwrap().is_some());
}

#[tokio::test]
async fn mutations_stamp_time_from_the_clock() {
    let later = now() + Duration::hours(1);
    let mut clock = MockClockPort::new();
    let mut calls = 0;
    clock.expect_now().returning(move || {
        calls += 1;
        if calls == 1 {
            now()
        } else {
            later
        }
    });

    let store = InMemoryCategoryRepo::new();
    let catalog = CategoryHierarchy::new(
        Arc::new(store.clone()),
        Arc::new(InMemoryProductCounts::for_store(&store)),
        Arc::new(clock),
    );

    let created = catalog.create(NewCategory::new("Shoes")).await.unwrap();
    assert_eq!(created.created_at(), now());
    assert_eq!(created.updated_at(), now());

    let renamed = catalog.rename(created.id(), "Boots").await.unwrap();
    assert_eq!(renamed.created_at(), now());
    assert_eq!(renamed.updated_at(), later);
}
