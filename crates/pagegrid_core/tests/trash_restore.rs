use pagegrid_core::db::open_db_in_memory;
use pagegrid_core::{
    CellRepository, LayoutDefinition, Page, PlacementService, Scope, SqliteCellRepository,
    SqliteElementRepository, StaticLayoutRegistry, TrashError, TrashService,
};
use rusqlite::Connection;
use uuid::Uuid;

fn setup() -> rusqlite::Connection {
    open_db_in_memory().unwrap()
}

fn registry() -> StaticLayoutRegistry {
    let mut registry = StaticLayoutRegistry::new();
    registry.register(
        LayoutDefinition::new("standard")
            .with_cell("header")
            .with_cell("sidebar"),
    );
    registry
}

fn placement<'c>(
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

fn trash_service(
    conn: &Connection,
) -> TrashService<SqliteElementRepository<'_>, SqliteCellRepository<'_>> {
    TrashService::new(
        SqliteElementRepository::try_new(conn).unwrap(),
        SqliteCellRepository::try_new(conn).unwrap(),
    )
}

#[test]
fn trash_clears_position_and_renumbers_the_scope() {
    let conn = setup();
    let layouts = registry();
    let service = placement(&conn, &layouts);
    let trash = trash_service(&conn);
    let page = Page::new("standard");
    let scope = Scope::page(page.uuid);

    let a = service.create_element(&page, "article", None).unwrap();
    let b = service.create_element(&page, "article", None).unwrap();
    let c = service.create_element(&page, "article", None).unwrap();

    let trashed = trash.trash(b.uuid).unwrap();
    assert_eq!(trashed.position, None);
    // The last scope stays on the record for audit and restore default.
    assert_eq!(trashed.page_uuid, page.uuid);

    let remaining = service.list_scope(&scope).unwrap();
    assert_eq!(remaining.len(), 2);
    assert_eq!(remaining[0].uuid, a.uuid);
    assert_eq!(remaining[0].position, Some(1));
    assert_eq!(remaining[1].uuid, c.uuid);
    assert_eq!(remaining[1].position, Some(2));
}

#[test]
fn trashing_twice_is_a_noop() {
    let conn = setup();
    let layouts = registry();
    let service = placement(&conn, &layouts);
    let trash = trash_service(&conn);
    let page = Page::new("standard");

    let element = service.create_element(&page, "article", None).unwrap();
    trash.trash(element.uuid).unwrap();
    let again = trash.trash(element.uuid).unwrap();
    assert_eq!(again.position, None);
}

#[test]
fn trash_rejects_unknown_elements() {
    let conn = setup();
    let trash = trash_service(&conn);

    let unknown = Uuid::new_v4();
    let err = trash.trash(unknown).unwrap_err();
    assert!(matches!(err, TrashError::ElementNotFound(id) if id == unknown));
}

#[test]
fn restore_defaults_to_bottom_of_the_prior_scope() {
    let conn = setup();
    let layouts = registry();
    let service = placement(&conn, &layouts);
    let trash = trash_service(&conn);
    let page = Page::new("standard");
    let scope = Scope::page(page.uuid);

    let a = service.create_element(&page, "article", None).unwrap();
    let b = service.create_element(&page, "article", None).unwrap();

    trash.trash(a.uuid).unwrap();
    let restored = trash.restore(a.uuid, None).unwrap();

    assert_eq!(restored.scope(), scope);
    assert_eq!(restored.position, Some(2));

    let listed = service.list_scope(&scope).unwrap();
    assert_eq!(listed[0].uuid, b.uuid);
    assert_eq!(listed[0].position, Some(1));
    assert_eq!(listed[1].uuid, a.uuid);
}

#[test]
fn restore_accepts_a_new_page_and_cell_target() {
    let conn = setup();
    let layouts = registry();
    let service = placement(&conn, &layouts);
    let trash = trash_service(&conn);
    let page = Page::new("standard");
    let target_page = Page::new("standard");

    // Materialize the target cell on the target page.
    let resident = service
        .create_element(&target_page, "article#header", None)
        .unwrap();
    let cell_uuid = resident.cell_uuid.unwrap();

    let element = service.create_element(&page, "article", None).unwrap();
    trash.trash(element.uuid).unwrap();

    let target = Scope::cell(target_page.uuid, cell_uuid);
    let restored = trash.restore(element.uuid, Some(target)).unwrap();

    assert_eq!(restored.page_uuid, target_page.uuid);
    assert_eq!(restored.cell_uuid, Some(cell_uuid));
    assert_eq!(restored.position, Some(2));
}

#[test]
fn restore_rejects_cells_of_other_pages() {
    let conn = setup();
    let layouts = registry();
    let service = placement(&conn, &layouts);
    let trash = trash_service(&conn);
    let page = Page::new("standard");
    let other_page = Page::new("standard");

    let celled = service
        .create_element(&other_page, "article#header", None)
        .unwrap();
    let foreign_cell = celled.cell_uuid.unwrap();

    let element = service.create_element(&page, "article", None).unwrap();
    trash.trash(element.uuid).unwrap();

    let err = trash
        .restore(element.uuid, Some(Scope::cell(page.uuid, foreign_cell)))
        .unwrap_err();
    assert!(matches!(
        err,
        TrashError::InvalidScope { page_uuid, cell_uuid }
            if page_uuid == page.uuid && cell_uuid == foreign_cell
    ));

    // The failed restore leaves the element trashed.
    let cells = SqliteCellRepository::try_new(&conn).unwrap();
    assert!(cells.get_cell(foreign_cell).unwrap().is_some());
    let still_trashed = service.list_page(page.uuid, true).unwrap();
    assert!(still_trashed
        .iter()
        .any(|e| e.uuid == element.uuid && e.position.is_none()));
}

#[test]
fn restore_rejects_missing_cells_and_active_elements() {
    let conn = setup();
    let layouts = registry();
    let service = placement(&conn, &layouts);
    let trash = trash_service(&conn);
    let page = Page::new("standard");

    let element = service.create_element(&page, "article", None).unwrap();

    let err = trash.restore(element.uuid, None).unwrap_err();
    assert!(matches!(err, TrashError::NotTrashed(id) if id == element.uuid));

    trash.trash(element.uuid).unwrap();
    let ghost_cell = Uuid::new_v4();
    let err = trash
        .restore(element.uuid, Some(Scope::cell(page.uuid, ghost_cell)))
        .unwrap_err();
    assert!(matches!(err, TrashError::CellNotFound(id) if id == ghost_cell));
}

#[test]
fn reorder_adopts_trashed_elements_into_the_scope() {
    let conn = setup();
    let layouts = registry();
    let service = placement(&conn, &layouts);
    let trash = trash_service(&conn);
    let page = Page::new("standard");
    let target_page = Page::new("standard");

    let element = service.create_element(&page, "article", None).unwrap();
    trash.trash(element.uuid).unwrap();

    // Ordering a trashed element into a scope restores it there with a
    // fresh position and the scope's page/cell identity.
    let target_scope = Scope::page(target_page.uuid);
    let reordered = service.reorder(&target_scope, &[element.uuid]).unwrap();

    assert_eq!(reordered.len(), 1);
    let restored = &reordered[0];
    assert_eq!(restored.uuid, element.uuid);
    assert_eq!(restored.page_uuid, target_page.uuid);
    assert_eq!(restored.cell_uuid, None);
    assert_eq!(restored.position, Some(1));
}

#[test]
fn density_holds_across_mixed_operation_sequences() {
    let conn = setup();
    let layouts = registry();
    let service = placement(&conn, &layouts);
    let trash = trash_service(&conn);
    let page = Page::new("standard");
    let scope = Scope::page(page.uuid);

    let a = service.create_element(&page, "article", None).unwrap();
    let b = service.create_element(&page, "article", None).unwrap();
    let c = service.create_element(&page, "article", None).unwrap();
    let d = service.create_element(&page, "article", None).unwrap();

    trash.trash(b.uuid).unwrap();
    service.reorder(&scope, &[d.uuid, a.uuid, c.uuid]).unwrap();
    trash.restore(b.uuid, None).unwrap();
    trash.trash(a.uuid).unwrap();

    let listed = service.list_scope(&scope).unwrap();
    let positions: Vec<i64> = listed
        .iter()
        .map(|element| element.position.unwrap())
        .collect();
    assert_eq!(positions, vec![1, 2, 3]);

    let ids: Vec<_> = listed.iter().map(|element| element.uuid).collect();
    assert_eq!(ids, vec![d.uuid, c.uuid, b.uuid]);
}
