use pagegrid_core::db::open_db_in_memory;
use pagegrid_core::{
    CellRepository, Element, ElementId, InsertPosition, LayoutDefinition, Page, PlacementError,
    PlacementService, Scope, SqliteCellRepository, SqliteElementRepository, StaticLayoutRegistry,
};
use rusqlite::Connection;

fn setup() -> rusqlite::Connection {
    open_db_in_memory().unwrap()
}

fn registry() -> StaticLayoutRegistry {
    let mut registry = StaticLayoutRegistry::new();
    registry.register(LayoutDefinition::new("standard").with_cell("header"));
    registry.register(
        LayoutDefinition::new("news")
            .with_cell("news")
            .insert_at(InsertPosition::Top),
    );
    registry
}

fn service<'c>(
    conn: &'c Connection,
    layouts: &'c StaticLayoutRegistry,
) -> PlacementService<
    SqliteElementRepository<'c>,
    SqliteCellRepository<'c>,
    &'c StaticLayoutRegistry,
> {
    PlacementService::new(
        SqliteElementRepository::try_new(conn).unwrap(),
        SqliteCellRepository::try_new(conn).unwrap(),
        layouts,
    )
}

fn scope_positions(elements: &[Element]) -> Vec<(ElementId, i64)> {
    elements
        .iter()
        .map(|element| (element.uuid, element.position.unwrap()))
        .collect()
}

#[test]
fn bottom_mode_appends_after_last_sibling() {
    let conn = setup();
    let layouts = registry();
    let service = service(&conn, &layouts);
    let page = Page::new("standard");

    let first = service.create_element(&page, "article", None).unwrap();
    let second = service.create_element(&page, "news_teaser", None).unwrap();

    assert_eq!(first.position, Some(1));
    assert_eq!(second.position, Some(2));

    let listed = service.list_scope(&Scope::page(page.uuid)).unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed.last().unwrap().name, "news_teaser");
}

#[test]
fn top_mode_inserts_at_one_and_shifts_siblings() {
    let conn = setup();
    let layouts = registry();
    let service = service(&conn, &layouts);
    let page = Page::new("news");

    let old_first = service.create_element(&page, "news", None).unwrap();
    let old_second = service.create_element(&page, "news", None).unwrap();
    // After two top insertions the older element sits below the newer.
    let newest = service.create_element(&page, "news", None).unwrap();

    let listed = service.list_scope(&Scope::page(page.uuid)).unwrap();
    assert_eq!(
        scope_positions(&listed),
        vec![
            (newest.uuid, 1),
            (old_second.uuid, 2),
            (old_first.uuid, 3),
        ]
    );
}

#[test]
fn compound_name_places_element_in_declared_cell() {
    let conn = setup();
    let layouts = registry();
    let service = service(&conn, &layouts);
    let page = Page::new("standard");

    let element = service.create_element(&page, "article#header", None).unwrap();
    assert_eq!(element.name, "article");
    assert!(element.cell_uuid.is_some());

    let cells = SqliteCellRepository::try_new(&conn).unwrap();
    let cell = cells.get_cell(element.cell_uuid.unwrap()).unwrap().unwrap();
    assert_eq!(cell.name, "header");
    assert_eq!(cell.page_uuid, page.uuid);
}

#[test]
fn cell_resolution_is_idempotent() {
    let conn = setup();
    let layouts = registry();
    let service = service(&conn, &layouts);
    let page = Page::new("standard");

    let first = service.create_element(&page, "article#header", None).unwrap();
    let second = service.create_element(&page, "article#header", None).unwrap();

    assert_eq!(first.cell_uuid, second.cell_uuid);

    let cells = SqliteCellRepository::try_new(&conn).unwrap();
    assert_eq!(cells.list_for_page(page.uuid).unwrap().len(), 1);
}

#[test]
fn plain_name_falls_back_to_uncelled_scope() {
    let conn = setup();
    let layouts = registry();
    let service = service(&conn, &layouts);
    let page = Page::new("standard");

    let element = service.create_element(&page, "article", None).unwrap();
    assert_eq!(element.cell_uuid, None);
    assert_eq!(element.scope(), Scope::page(page.uuid));
}

#[test]
fn undeclared_cell_is_rejected() {
    let conn = setup();
    let layouts = registry();
    let service = service(&conn, &layouts);
    let page = Page::new("standard");

    let err = service
        .create_element(&page, "article#footer", None)
        .unwrap_err();
    assert!(matches!(
        err,
        PlacementError::UndeclaredCell { cell_name, .. } if cell_name == "footer"
    ));
}

#[test]
fn cell_override_takes_precedence_over_name_suffix() {
    let conn = setup();
    let layouts = registry();
    let service = service(&conn, &layouts);
    let page = Page::new("standard");

    let element = service
        .create_element(&page, "article", Some("header"))
        .unwrap();
    assert!(element.cell_uuid.is_some());

    // Override also applies when the raw name carries its own suffix.
    let err = service
        .create_element(&page, "article#header", Some("footer"))
        .unwrap_err();
    assert!(matches!(err, PlacementError::UndeclaredCell { .. }));
}

#[test]
fn malformed_names_are_rejected() {
    let conn = setup();
    let layouts = registry();
    let service = service(&conn, &layouts);
    let page = Page::new("standard");

    for raw in ["", "article#", "a#b#c"] {
        let err = service.create_element(&page, raw, None).unwrap_err();
        assert!(matches!(err, PlacementError::InvalidName(_)), "raw=`{raw}`");
    }
}

#[test]
fn reorder_assigns_positions_in_request_order() {
    let conn = setup();
    let layouts = registry();
    let service = service(&conn, &layouts);
    let page = Page::new("standard");
    let scope = Scope::page(page.uuid);

    let a = service.create_element(&page, "article", None).unwrap();
    let b = service.create_element(&page, "article", None).unwrap();
    let c = service.create_element(&page, "article", None).unwrap();

    let reordered = service.reorder(&scope, &[c.uuid, a.uuid, b.uuid]).unwrap();
    assert_eq!(
        scope_positions(&reordered),
        vec![(c.uuid, 1), (a.uuid, 2), (b.uuid, 3)]
    );
}

#[test]
fn reorder_rejects_unknown_and_foreign_ids() {
    let conn = setup();
    let layouts = registry();
    let service = service(&conn, &layouts);
    let page = Page::new("standard");
    let other_page = Page::new("standard");
    let scope = Scope::page(page.uuid);

    let member = service.create_element(&page, "article", None).unwrap();
    let foreign = service.create_element(&other_page, "article", None).unwrap();

    let unknown = uuid::Uuid::new_v4();
    let err = service
        .reorder(&scope, &[member.uuid, unknown])
        .unwrap_err();
    assert!(matches!(err, PlacementError::ElementNotFound(id) if id == unknown));

    let err = service
        .reorder(&scope, &[member.uuid, foreign.uuid])
        .unwrap_err();
    assert!(matches!(err, PlacementError::ElementNotFound(id) if id == foreign.uuid));

    // Failed reorders leave the scope unchanged.
    let listed = service.list_scope(&scope).unwrap();
    assert_eq!(scope_positions(&listed), vec![(member.uuid, 1)]);
}

#[test]
fn partial_reorder_keeps_unlisted_members_dense() {
    let conn = setup();
    let layouts = registry();
    let service = service(&conn, &layouts);
    let page = Page::new("standard");
    let scope = Scope::page(page.uuid);

    let a = service.create_element(&page, "article", None).unwrap();
    let b = service.create_element(&page, "article", None).unwrap();
    let c = service.create_element(&page, "article", None).unwrap();

    let reordered = service.reorder(&scope, &[c.uuid]).unwrap();
    assert_eq!(
        scope_positions(&reordered),
        vec![(c.uuid, 1), (a.uuid, 2), (b.uuid, 3)]
    );
}

#[test]
fn scopes_are_independent_orderings() {
    let conn = setup();
    let layouts = registry();
    let service = service(&conn, &layouts);
    let page = Page::new("standard");

    let uncelled = service.create_element(&page, "article", None).unwrap();
    let celled = service.create_element(&page, "article#header", None).unwrap();

    // Both scopes start their own dense sequence at 1.
    assert_eq!(uncelled.position, Some(1));
    assert_eq!(celled.position, Some(1));

    let page_elements = service.list_page(page.uuid, false).unwrap();
    assert_eq!(page_elements.len(), 2);
}

#[test]
fn unknown_layouts_default_to_bottom_and_no_cells() {
    let conn = setup();
    let layouts = registry();
    let service = service(&conn, &layouts);
    let page = Page::new("unregistered");

    let first = service.create_element(&page, "article", None).unwrap();
    let second = service.create_element(&page, "article", None).unwrap();
    assert_eq!(first.position, Some(1));
    assert_eq!(second.position, Some(2));

    let err = service
        .create_element(&page, "article#header", None)
        .unwrap_err();
    assert!(matches!(err, PlacementError::UndeclaredCell { .. }));
}
