//! Integration tests for the full quotation pipeline.
//!
//! Tests: Upsert → ClientResolver → TaxCalculator → store → TicketSynchronizer
//!
//! Verifies:
//! - Totals are always recomputed server-side
//! - Reference uniqueness is per owner
//! - The status state machine rejects illegal manual transitions
//! - Deletion backs up, cascades, and stays atomic
//! - Any mid-pipeline failure rolls the whole transaction back

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use quotedesk_auth::{AuthContext, Role};
    use quotedesk_clients::ClientDraft;
    use quotedesk_core::{DomainError, DomainResult, UserId};
    use quotedesk_quotations::{
        BillingAddress, GoodsLineDraft, QuotationDraft, QuotationStatus,
    };
    use quotedesk_tax::{TaxCalculator, TaxConfig};
    use quotedesk_tickets::TicketStatus;

    use crate::catalog::{CatalogItem, InMemoryItemCatalog};
    use crate::engine::QuotationEngine;
    use crate::query::{Pagination, QuotationFilter, Sort};
    use crate::ticket_sync::HOLD_NOTE;
    use crate::unit_of_work::{DocumentSet, InMemoryUnitOfWork, UnitOfWork};

    type TestEngine = QuotationEngine<Arc<InMemoryUnitOfWork>, Arc<InMemoryItemCatalog>>;

    fn setup() -> (TestEngine, Arc<InMemoryUnitOfWork>, Arc<InMemoryItemCatalog>) {
        let uow = Arc::new(InMemoryUnitOfWork::new());
        let catalog = Arc::new(InMemoryItemCatalog::new());
        let tax = TaxCalculator::new(TaxConfig {
            home_jurisdiction: "maharashtra".to_string(),
        });
        let engine = QuotationEngine::new(uow.clone(), catalog.clone(), tax);
        (engine, uow, catalog)
    }

    fn user_ctx() -> AuthContext {
        AuthContext::new(UserId::new(), Role::User)
    }

    fn client_draft(email: &str, company: &str, tax_id: &str) -> ClientDraft {
        ClientDraft {
            email: Some(email.to_string()),
            company: Some(company.to_string()),
            tax_id: Some(tax_id.to_string()),
            ..ClientDraft::default()
        }
    }

    fn goods_line(description: &str, quantity: f64, unit_price: f64, tax_rate: f64) -> GoodsLineDraft {
        GoodsLineDraft {
            description: Some(description.to_string()),
            quantity: Some(quantity),
            unit: Some("pcs".to_string()),
            unit_price: Some(unit_price),
            tax_rate: Some(tax_rate),
            ..GoodsLineDraft::default()
        }
    }

    fn draft(reference: &str, jurisdiction: &str) -> QuotationDraft {
        QuotationDraft {
            reference: Some(reference.to_string()),
            client: client_draft("buyer@acme.example", "Acme Industries", "27AAACR5055K1Z5"),
            billing: BillingAddress {
                line1: "Plot 12, MIDC".to_string(),
                line2: String::new(),
                city: "Pune".to_string(),
                postal_code: "411019".to_string(),
                jurisdiction: jurisdiction.to_string(),
            },
            goods: vec![goods_line("Steel rod 12mm", 10.0, 100.0, 18.0)],
            terms: Some("Delivery within 2 weeks".to_string()),
            ..QuotationDraft::default()
        }
    }

    #[test]
    fn upsert_creates_quotation_with_recomputed_totals() {
        let (engine, _uow, _) = setup();
        let ctx = user_ctx();

        let quotation = engine.upsert(&ctx, None, &draft("Q-000001", "maharashtra")).unwrap();

        assert_eq!(quotation.status, QuotationStatus::Open);
        assert_eq!(quotation.totals.total_quantity, 10.0);
        assert_eq!(quotation.totals.total_amount, 1000.0);
        assert_eq!(quotation.totals.tax_amount, 180.0);
        assert_eq!(quotation.totals.grand_total, 1180.0);
        assert_eq!(quotation.goods[0].amount, 1000.0);

        let fetched = engine.get(&ctx, quotation.id).unwrap();
        assert_eq!(fetched, quotation);
    }

    #[test]
    fn upsert_requires_reference_and_goods() {
        let (engine, _uow, _) = setup();
        let ctx = user_ctx();

        let mut no_reference = draft("Q-000001", "maharashtra");
        no_reference.reference = None;
        assert!(matches!(
            engine.upsert(&ctx, None, &no_reference),
            Err(DomainError::InvalidInput(_))
        ));

        let mut no_goods = draft("Q-000001", "maharashtra");
        no_goods.goods.clear();
        assert!(matches!(
            engine.upsert(&ctx, None, &no_goods),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn duplicate_reference_conflicts_per_owner_only() {
        let (engine, _uow, _) = setup();
        let alice = user_ctx();
        let bob = user_ctx();

        engine.upsert(&alice, None, &draft("Q-000001", "maharashtra")).unwrap();

        // Same owner, same reference: conflict.
        let err = engine
            .upsert(&alice, None, &draft("Q-000001", "maharashtra"))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        // Different owner, same reference: fine.
        engine.upsert(&bob, None, &draft("Q-000001", "maharashtra")).unwrap();
    }

    #[test]
    fn updating_keeps_own_reference_without_conflict() {
        let (engine, _uow, _) = setup();
        let ctx = user_ctx();

        let created = engine.upsert(&ctx, None, &draft("Q-000001", "maharashtra")).unwrap();

        let mut update = draft("Q-000001", "maharashtra");
        update.goods = vec![goods_line("Steel rod 16mm", 5.0, 220.0, 18.0)];
        let updated = engine.upsert(&ctx, Some(created.id), &update).unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.totals.total_amount, 1100.0);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[test]
    fn repeated_upserts_reuse_one_client_and_accumulate_back_refs() {
        let (engine, _uow, _) = setup();
        let ctx = user_ctx();

        let q1 = engine.upsert(&ctx, None, &draft("Q-000001", "maharashtra")).unwrap();
        let q2 = engine.upsert(&ctx, None, &draft("Q-000002", "maharashtra")).unwrap();

        assert_eq!(q1.client_id, q2.client_id);

        let clients = engine.list_clients(&ctx).unwrap();
        assert_eq!(clients.len(), 1);
        assert!(clients[0].quotation_refs.contains(&q1.id.0));
        assert!(clients[0].quotation_refs.contains(&q2.id.0));
    }

    #[test]
    fn interstate_billing_switches_to_igst() {
        let (engine, _uow, _) = setup();
        let ctx = user_ctx();

        let quotation = engine.upsert(&ctx, None, &draft("Q-000001", "karnataka")).unwrap();

        assert_eq!(quotation.totals.tax_amount, 180.0);
        assert_eq!(quotation.totals.grand_total, 1180.0);
    }

    #[test]
    fn catalog_items_provide_line_descriptions() {
        let (engine, _uow, catalog) = setup();
        let ctx = user_ctx();

        let item = CatalogItem {
            id: quotedesk_quotations::ItemId::new(quotedesk_core::RecordId::new()),
            name: "Hex bolt M8".to_string(),
            unit: "box".to_string(),
            unit_price: 450.0,
            tax_rate: 18.0,
        };
        catalog.insert(item.clone());

        let mut d = draft("Q-000001", "maharashtra");
        d.goods = vec![GoodsLineDraft {
            item_id: Some(item.id),
            quantity: Some(2.0),
            unit_price: Some(450.0),
            tax_rate: Some(18.0),
            ..GoodsLineDraft::default()
        }];

        let quotation = engine.upsert(&ctx, None, &d).unwrap();
        assert_eq!(quotation.goods[0].description, "Hex bolt M8");
        assert_eq!(quotation.goods[0].unit, "box");
    }

    #[test]
    fn status_walks_open_hold_open_but_never_out_of_closed() {
        let (engine, uow, _) = setup();
        let ctx = user_ctx();

        let created = engine.upsert(&ctx, None, &draft("Q-000001", "maharashtra")).unwrap();

        let mut to_hold = draft("Q-000001", "maharashtra");
        to_hold.status = Some(QuotationStatus::Hold);
        let held = engine.upsert(&ctx, Some(created.id), &to_hold).unwrap();
        assert_eq!(held.status, QuotationStatus::Hold);

        let mut to_open = draft("Q-000001", "maharashtra");
        to_open.status = Some(QuotationStatus::Open);
        let reopened = engine.upsert(&ctx, Some(created.id), &to_open).unwrap();
        assert_eq!(reopened.status, QuotationStatus::Open);

        // Fulfillment closes the quotation out of band.
        uow.transact(|docs| {
            docs.quotations.get_mut(&created.id).unwrap().status = QuotationStatus::Closed;
            Ok(())
        })
        .unwrap();

        let err = engine
            .upsert(&ctx, Some(created.id), &to_open)
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn omitted_status_preserves_current_on_edit() {
        let (engine, uow, _) = setup();
        let ctx = user_ctx();

        let created = engine.upsert(&ctx, None, &draft("Q-000001", "maharashtra")).unwrap();
        uow.transact(|docs| {
            docs.quotations.get_mut(&created.id).unwrap().status = QuotationStatus::Running;
            Ok(())
        })
        .unwrap();

        // Unrelated edit with no status field: accepted, status untouched.
        let mut update = draft("Q-000001", "maharashtra");
        update.terms = Some("Revised terms".to_string());
        let updated = engine.upsert(&ctx, Some(created.id), &update).unwrap();
        assert_eq!(updated.status, QuotationStatus::Running);
        assert_eq!(updated.terms.as_deref(), Some("Revised terms"));
    }

    #[test]
    fn update_of_foreign_quotation_is_not_found_unless_super_admin() {
        let (engine, _uow, _) = setup();
        let alice = user_ctx();
        let mallory = user_ctx();
        let root = AuthContext::new(UserId::new(), Role::SuperAdmin);

        let created = engine.upsert(&alice, None, &draft("Q-000001", "maharashtra")).unwrap();

        let err = engine
            .upsert(&mallory, Some(created.id), &draft("Q-000001", "maharashtra"))
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);

        // Super-admin edits across owners; the record keeps its owner.
        let updated = engine
            .upsert(&root, Some(created.id), &draft("Q-000001", "maharashtra"))
            .unwrap();
        assert_eq!(updated.owner_id, alice.user_id);
    }

    #[test]
    fn linking_a_foreign_client_requires_super_admin() {
        let (engine, _uow, _) = setup();
        let alice = user_ctx();
        let bob = user_ctx();
        let root = AuthContext::new(UserId::new(), Role::SuperAdmin);

        let alices = engine.upsert(&alice, None, &draft("Q-000001", "maharashtra")).unwrap();

        // Bob tries to point his quotation at Alice's client by id.
        let mut cross = draft("Q-000002", "maharashtra");
        cross.client = ClientDraft::for_existing(alices.client_id);
        let err = engine.upsert(&bob, None, &cross).unwrap_err();
        assert_eq!(err, DomainError::Unauthorized);

        // A super-admin may re-link across owners.
        let linked = engine.upsert(&root, None, &cross).unwrap();
        assert_eq!(linked.client_id, alices.client_id);
    }

    #[test]
    fn quotation_update_syncs_open_tickets_only() {
        let (engine, uow, _) = setup();
        let ctx = user_ctx();

        let created = engine.upsert(&ctx, None, &draft("Q-000001", "maharashtra")).unwrap();
        let open_ticket = engine.open_ticket(&ctx, "Q-000001").unwrap();
        let invoiced_ticket = engine.open_ticket(&ctx, "Q-000001").unwrap();

        uow.transact(|docs| {
            docs.tickets
                .get_mut(&invoiced_ticket.id)
                .unwrap()
                .set_status(TicketStatus::Invoiced, "invoiced", Utc::now());
            Ok(())
        })
        .unwrap();

        let mut update = draft("Q-000001", "maharashtra");
        update.goods = vec![goods_line("Steel rod 12mm", 20.0, 100.0, 18.0)];
        engine.upsert(&ctx, Some(created.id), &update).unwrap();

        let tickets = engine.tickets_for_reference(&ctx, "Q-000001").unwrap();
        let synced = tickets.iter().find(|t| t.id == open_ticket.id).unwrap();
        let frozen = tickets.iter().find(|t| t.id == invoiced_ticket.id).unwrap();

        assert_eq!(synced.total_amount, 2000.0);
        assert_eq!(synced.grand_total, 2360.0);
        // The invoiced ticket keeps its settled figures.
        assert_eq!(frozen.total_amount, 1000.0);
        assert_eq!(frozen.grand_total, 1180.0);
    }

    #[test]
    fn delete_backs_up_cascades_and_spares_finalized_tickets() {
        let (engine, uow, _) = setup();
        let ctx = user_ctx();

        let created = engine.upsert(&ctx, None, &draft("Q-000001", "maharashtra")).unwrap();
        let live = engine.open_ticket(&ctx, "Q-000001").unwrap();
        let closed = engine.open_ticket(&ctx, "Q-000001").unwrap();

        uow.transact(|docs| {
            docs.tickets
                .get_mut(&closed.id)
                .unwrap()
                .set_status(TicketStatus::Closed, "done", Utc::now());
            Ok(())
        })
        .unwrap();

        let backup_id = engine.delete(&ctx, created.id).unwrap();

        assert_eq!(engine.get(&ctx, created.id).unwrap_err(), DomainError::NotFound);

        let backups = engine.list_backups(&ctx).unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].id, backup_id);
        assert_eq!(backups[0].document["reference"], "Q-000001");

        // Both tickets are tombstoned; only the live one is forced on hold.
        let tickets = engine.tickets_for_reference(&ctx, "void:Q-000001").unwrap();
        assert_eq!(tickets.len(), 2);

        let live_after = tickets.iter().find(|t| t.id == live.id).unwrap();
        assert_eq!(live_after.status, TicketStatus::Hold);
        assert_eq!(live_after.status_history.last().unwrap().note, HOLD_NOTE);

        let closed_after = tickets.iter().find(|t| t.id == closed.id).unwrap();
        assert_eq!(closed_after.status, TicketStatus::Closed);

        // Back-reference is gone from the client.
        let clients = engine.list_clients(&ctx).unwrap();
        assert!(!clients[0].quotation_refs.contains(&created.id.0));
    }

    #[test]
    fn delete_of_missing_quotation_leaves_no_backup() {
        let (engine, _uow, _) = setup();
        let ctx = user_ctx();

        let created = engine.upsert(&ctx, None, &draft("Q-000001", "maharashtra")).unwrap();
        engine.delete(&ctx, created.id).unwrap();

        let err = engine.delete(&ctx, created.id).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
        assert_eq!(engine.list_backups(&ctx).unwrap().len(), 1);
    }

    #[test]
    fn late_pipeline_failure_rolls_back_client_changes() {
        let (engine, uow, _) = setup();
        let ctx = user_ctx();

        let created = engine.upsert(&ctx, None, &draft("Q-000001", "maharashtra")).unwrap();
        uow.transact(|docs| {
            docs.quotations.get_mut(&created.id).unwrap().status = QuotationStatus::Running;
            Ok(())
        })
        .unwrap();

        // Client rename resolves before the status rule rejects the upsert;
        // the abort must discard it.
        let mut update = draft("Q-000001", "maharashtra");
        update.client = client_draft("buyer@acme.example", "Acme Renamed", "27AAACR5055K1Z5");
        update.status = Some(QuotationStatus::Open);

        let err = engine.upsert(&ctx, Some(created.id), &update).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let clients = engine.list_clients(&ctx).unwrap();
        assert_eq!(clients[0].company, "Acme Industries");
    }

    /// Wraps a working unit of work but fails every commit after the
    /// closure has mutated the working copy.
    struct CommitFailUow {
        inner: Arc<InMemoryUnitOfWork>,
    }

    impl UnitOfWork for CommitFailUow {
        fn transact<T, F>(&self, f: F) -> DomainResult<T>
        where
            F: FnOnce(&mut DocumentSet) -> DomainResult<T>,
        {
            self.inner.transact(|docs| {
                f(docs).and_then(|_| Err(DomainError::storage("injected commit failure")))
            })
        }

        fn read<T, F>(&self, f: F) -> DomainResult<T>
        where
            F: FnOnce(&DocumentSet) -> T,
        {
            self.inner.read(f)
        }
    }

    #[test]
    fn failed_commit_leaves_prior_state_untouched() {
        let (engine, uow, catalog) = setup();
        let ctx = user_ctx();

        let created = engine.upsert(&ctx, None, &draft("Q-000001", "maharashtra")).unwrap();
        engine.open_ticket(&ctx, "Q-000001").unwrap();
        let before = uow.read(|docs| docs.clone()).unwrap();

        let failing = QuotationEngine::new(
            CommitFailUow { inner: uow.clone() },
            catalog,
            TaxCalculator::new(TaxConfig {
                home_jurisdiction: "maharashtra".to_string(),
            }),
        );

        let mut update = draft("Q-000001", "maharashtra");
        update.goods = vec![goods_line("Steel rod 12mm", 99.0, 100.0, 18.0)];
        let err = failing.upsert(&ctx, Some(created.id), &update).unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));

        // Bit-for-bit identical: no partial totals, no half-synced ticket.
        let after = uow.read(|docs| docs.clone()).unwrap();
        assert_eq!(after.quotations, before.quotations);
        assert_eq!(after.tickets, before.tickets);
        assert_eq!(after.clients, before.clients);
    }

    #[test]
    fn allocated_references_are_sequential_and_available() {
        let (engine, _uow, _) = setup();
        let ctx = user_ctx();

        let first = engine.allocate_reference().unwrap();
        let second = engine.allocate_reference().unwrap();
        assert_eq!(first, "Q-000001");
        assert_eq!(second, "Q-000002");

        assert!(engine.check_reference_available(&ctx, &first).unwrap());
        engine.upsert(&ctx, None, &draft(&first, "maharashtra")).unwrap();
        assert!(!engine.check_reference_available(&ctx, &first).unwrap());
    }

    #[test]
    fn list_filters_searches_and_paginates() {
        let (engine, _uow, _) = setup();
        let ctx = user_ctx();
        let other = user_ctx();

        let mut a = draft("Q-000001", "maharashtra");
        a.client = client_draft("buyer@acme.example", "Acme Industries", "GSTIN1");
        engine.upsert(&ctx, None, &a).unwrap();

        let mut b = draft("Q-000002", "maharashtra");
        b.client = client_draft("sales@borel.example", "Borel Fabrication", "GSTIN2");
        b.status = Some(QuotationStatus::Hold);
        engine.upsert(&ctx, None, &b).unwrap();

        engine.upsert(&other, None, &draft("Q-000003", "maharashtra")).unwrap();

        // Owner scoping: the other user's quotation is invisible.
        let all = engine
            .list(&ctx, &QuotationFilter::default(), Pagination::default(), Sort::default())
            .unwrap();
        assert_eq!(all.total, 2);

        // Status filter.
        let held = engine
            .list(
                &ctx,
                &QuotationFilter {
                    status: Some(QuotationStatus::Hold),
                    search: None,
                },
                Pagination::default(),
                Sort::default(),
            )
            .unwrap();
        assert_eq!(held.total, 1);
        assert_eq!(held.items[0].reference, "Q-000002");

        // Search hits the resolved client's company.
        let by_company = engine
            .list(
                &ctx,
                &QuotationFilter {
                    status: None,
                    search: Some("borel".to_string()),
                },
                Pagination::default(),
                Sort::default(),
            )
            .unwrap();
        assert_eq!(by_company.total, 1);
        assert_eq!(by_company.items[0].reference, "Q-000002");

        // Pagination.
        let page = engine
            .list(
                &ctx,
                &QuotationFilter::default(),
                Pagination {
                    limit: 1,
                    offset: 0,
                },
                Sort::default(),
            )
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, 2);
        assert!(page.has_more);

        // Super-admin sees everything.
        let root = AuthContext::new(UserId::new(), Role::SuperAdmin);
        let everything = engine
            .list(&root, &QuotationFilter::default(), Pagination::default(), Sort::default())
            .unwrap();
        assert_eq!(everything.total, 3);
    }

    #[test]
    fn find_by_reference_is_owner_scoped() {
        let (engine, _uow, _) = setup();
        let alice = user_ctx();
        let bob = user_ctx();

        engine.upsert(&alice, None, &draft("Q-000001", "maharashtra")).unwrap();

        let found = engine.find_by_reference(&alice, "Q-000001").unwrap();
        assert_eq!(found.owner_id, alice.user_id);

        assert_eq!(
            engine.find_by_reference(&bob, "Q-000001").unwrap_err(),
            DomainError::NotFound
        );
    }
}
