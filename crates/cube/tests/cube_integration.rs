//! End-to-end scenarios over the public cube API.

use std::rc::Rc;

use cubist_aggregate::{multiple_values, AggregatorKind};
use cubist_core::{DataType, Record, Value};
use cubist_cube::{
    info_from, BucketSpec, ChangeLog, Cube, Field, Info, QuerySpec, RowNode, RowPeek,
    UpdateOutcome,
};
use cubist_filter::{FieldFilter, Filter, FilterOp};

fn sales_cube() -> Cube {
    Cube::builder()
        .field(Field::dimension("cat", DataType::String))
        .field(Field::dimension("region", DataType::String))
        .field(Field::measure("amt", DataType::Int64, AggregatorKind::Sum))
        .field(Field::measure("avg_amt", DataType::Float64, AggregatorKind::Avg))
        .field(Field::measure("rep", DataType::String, AggregatorKind::Unique))
        .field(Field::measure("n", DataType::Int64, AggregatorKind::LeafCount))
        .build()
        .unwrap()
}

fn sale(id: u64, cat: &str, region: &str, amt: i64, rep: &str) -> Record {
    Record::new(
        id,
        vec![
            Value::String(cat.into()),
            Value::String(region.into()),
            Value::Int64(amt),
            Value::Int64(amt),
            Value::String(rep.into()),
            Value::Null,
        ],
    )
}

fn seed(cube: &mut Cube) {
    cube.load_data(
        vec![
            sale(1, "A", "east", 10, "ann"),
            sale(2, "A", "west", 20, "bob"),
            sale(3, "B", "east", 5, "ann"),
        ],
        Info::new(),
    )
    .unwrap();
}

fn collect_ids(rows: &[Rc<RowNode>], out: &mut Vec<String>) {
    for row in rows {
        out.push(row.id.clone());
        collect_ids(&row.children, out);
    }
}

#[test]
fn scenario_sum_by_category() {
    let mut cube = sales_cube();
    seed(&mut cube);

    let rows = cube
        .execute_query(QuerySpec::new().dimension("cat"))
        .unwrap();

    assert_eq!(rows.len(), 2);
    let a = &rows[0];
    assert_eq!(a.label, Value::String("A".into()));
    assert_eq!(a.dimension.as_deref(), Some("cat"));
    assert_eq!(a.values.get("amt"), Some(&Value::Int64(30)));
    assert_eq!(a.values.get("n"), Some(&Value::Int64(2)));

    let b = &rows[1];
    assert_eq!(b.values.get("amt"), Some(&Value::Int64(5)));
    assert_eq!(b.values.get("n"), Some(&Value::Int64(1)));
}

#[test]
fn aggregators_built_in_semantics() {
    let mut cube = sales_cube();
    seed(&mut cube);

    let rows = cube
        .execute_query(QuerySpec::new().dimension("cat"))
        .unwrap();

    // AVG of [10, 20] is 15; UNIQUE over two reps is the sentinel
    let a = &rows[0];
    assert_eq!(a.values.get("avg_amt"), Some(&Value::Float64(15.0)));
    assert_eq!(a.values.get("rep"), Some(&multiple_values()));

    // UNIQUE over a single rep is that rep
    let b = &rows[1];
    assert_eq!(b.values.get("rep"), Some(&Value::String("ann".into())));
}

#[test]
fn rebuild_is_idempotent() {
    let mut cube = sales_cube();
    seed(&mut cube);

    let spec = QuerySpec::new()
        .dimension("cat")
        .dimension("region")
        .include_root(true)
        .include_leaves(true);
    let first = cube.execute_query(spec.clone()).unwrap();
    let second = cube.execute_query(spec).unwrap();

    assert_eq!(first, second);
}

#[test]
fn nested_dimensions_chain_ids_and_sums() {
    let mut cube = sales_cube();
    seed(&mut cube);

    let rows = cube
        .execute_query(
            QuerySpec::new()
                .dimension("cat")
                .dimension("region")
                .include_leaves(true),
        )
        .unwrap();

    let a = &rows[0];
    assert_eq!(a.id, "root>>cat=A");
    assert_eq!(a.children.len(), 2);
    assert_eq!(a.children[0].id, "root>>cat=A>>region=east");
    assert_eq!(a.children[0].values.get("amt"), Some(&Value::Int64(10)));
    assert_eq!(a.children[0].children[0].id, "root>>cat=A>>region=east>>id=1");
}

#[test]
fn row_ids_are_pairwise_distinct() {
    let mut cube = sales_cube();
    seed(&mut cube);

    let rows = cube
        .execute_query(
            QuerySpec::new()
                .dimension("cat")
                .dimension("region")
                .include_root(true)
                .include_leaves(true),
        )
        .unwrap();

    let mut ids = Vec::new();
    collect_ids(&rows, &mut ids);
    let unique: std::collections::HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());
}

#[test]
fn degenerate_query_yields_no_rows() {
    let mut cube = sales_cube();
    seed(&mut cube);

    let rows = cube.execute_query(QuerySpec::new()).unwrap();
    assert!(rows.is_empty());
}

#[test]
fn filtered_root_id_carries_canonical_filter() {
    let mut cube = sales_cube();
    seed(&mut cube);

    let filter = Filter::from_clause(
        FieldFilter::new("amt", FilterOp::Gt, Value::Int64(12)).unwrap(),
    );
    let rows = cube
        .execute_query(
            QuerySpec::new()
                .dimension("cat")
                .filter(filter)
                .include_root(true),
        )
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, "amt>12");
    // only record 2 passes
    assert_eq!(rows[0].values.get("amt"), Some(&Value::Int64(20)));
    assert_eq!(rows[0].children.len(), 1);
    assert_eq!(rows[0].children[0].id, "amt>12>>cat=A");
}

#[test]
fn incremental_update_patches_only_affected_subtree() {
    let mut cube = sales_cube();
    seed(&mut cube);
    let view = cube
        .create_view(QuerySpec::new().dimension("cat"), true)
        .unwrap();

    let before = view.borrow().rows().to_vec();

    cube.update_data(
        ChangeLog::new().update(sale(1, "A", "east", 15, "ann")),
        Info::new(),
    )
    .unwrap();

    let view = view.borrow();
    let after = view.rows().to_vec();

    match view.last_outcome() {
        UpdateOutcome::Patched { changed_rows } => {
            assert!(changed_rows.contains(&String::from("root>>cat=A")));
        }
        other => panic!("expected Patched, got {:?}", other),
    }

    // cat=A updated in place, cat=B untouched (reference-stable)
    assert_eq!(after[0].values.get("amt"), Some(&Value::Int64(35)));
    assert!(!Rc::ptr_eq(&before[0], &after[0]));
    assert!(Rc::ptr_eq(&before[1], &after[1]));
}

#[test]
fn filter_flip_triggers_full_rebuild_with_new_group() {
    let mut cube = sales_cube();
    seed(&mut cube);

    let filter = Filter::from_clause(
        FieldFilter::new("amt", FilterOp::Gt, Value::Int64(12)).unwrap(),
    );
    let view = cube
        .create_view(QuerySpec::new().dimension("cat").filter(filter), true)
        .unwrap();

    // only record 2 (cat=A) is in the view
    assert_eq!(view.borrow().rows().len(), 1);

    // record 3's amt goes 5 -> 20: it newly passes the filter
    cube.update_data(
        ChangeLog::new().update(sale(3, "B", "east", 20, "ann")),
        Info::new(),
    )
    .unwrap();

    let view = view.borrow();
    assert_eq!(view.last_outcome(), &UpdateOutcome::Rebuilt);
    let labels: Vec<&Value> = view.rows().iter().map(|r| &r.label).collect();
    assert_eq!(
        labels,
        vec![&Value::String("A".into()), &Value::String("B".into())]
    );
}

#[test]
fn incremental_matches_full_rebuild_after_delta_sequence() {
    let mut cube = sales_cube();
    seed(&mut cube);
    let spec = QuerySpec::new()
        .dimension("cat")
        .dimension("region")
        .include_root(true)
        .include_leaves(true);
    let view = cube.create_view(spec.clone(), true).unwrap();

    let deltas = [
        ChangeLog::new().update(sale(1, "A", "east", 12, "ann")),
        ChangeLog::new().add(sale(4, "C", "west", 7, "cal")),
        ChangeLog::new().update(sale(2, "B", "west", 20, "bob")),
        ChangeLog::new().remove(3),
        ChangeLog::new().update(sale(4, "C", "west", 9, "cal")),
    ];
    for delta in deltas {
        cube.update_data(delta, Info::new()).unwrap();
    }

    let fresh = cube.execute_query(spec).unwrap();
    assert_eq!(view.borrow().rows(), &fresh[..]);
}

#[test]
fn update_query_reshapes_live_view() {
    let mut cube = sales_cube();
    seed(&mut cube);
    let view = cube
        .create_view(QuerySpec::new().dimension("cat"), true)
        .unwrap();

    view.borrow_mut()
        .update_query(QuerySpec::new().dimension("region"))
        .unwrap();

    let labels: Vec<Value> = view
        .borrow()
        .rows()
        .iter()
        .map(|r| r.label.clone())
        .collect();
    assert_eq!(
        labels,
        vec![Value::String("east".into()), Value::String("west".into())]
    );

    // the reshaped view still tracks cube updates
    cube.update_data(
        ChangeLog::new().update(sale(3, "B", "east", 8, "ann")),
        Info::new(),
    )
    .unwrap();
    assert_eq!(
        view.borrow().rows()[0].values.get("amt"),
        Some(&Value::Int64(18))
    );
}

#[test]
fn bucket_spec_collects_long_tail() {
    struct LongTail;

    impl BucketSpec for LongTail {
        fn name(&self) -> &str {
            "long-tail"
        }
        fn applies_to_level(&self, depth: usize, _dim: Option<&Field>) -> bool {
            depth == 0
        }
        fn bucket_for(&self, row: &RowPeek) -> Option<Value> {
            (!row.is_leaf && row.leaf_count < 2).then(|| Value::String("Other".into()))
        }
    }

    let mut cube = Cube::builder()
        .field(Field::dimension("cat", DataType::String))
        .field(Field::measure("amt", DataType::Int64, AggregatorKind::Sum))
        .bucket_spec(Rc::new(LongTail))
        .build()
        .unwrap();
    cube.load_data(
        vec![
            Record::new(1, vec![Value::String("A".into()), Value::Int64(10)]),
            Record::new(2, vec![Value::String("A".into()), Value::Int64(20)]),
            Record::new(3, vec![Value::String("B".into()), Value::Int64(5)]),
            Record::new(4, vec![Value::String("C".into()), Value::Int64(2)]),
        ],
        Info::new(),
    )
    .unwrap();

    let rows = cube
        .execute_query(QuerySpec::new().dimension("cat"))
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].label, Value::String("A".into()));
    assert_eq!(rows[1].label, Value::String("Other".into()));
    assert_eq!(rows[1].values.get("amt"), Some(&Value::Int64(7)));
    assert_eq!(rows[1].children.len(), 2);
}

#[test]
fn info_flows_to_views() {
    let mut cube = sales_cube();
    cube.load_data(
        vec![sale(1, "A", "east", 10, "ann")],
        info_from([("source", "warehouse")]),
    )
    .unwrap();

    let view = cube
        .create_view(QuerySpec::new().dimension("cat"), true)
        .unwrap();
    assert_eq!(
        view.borrow().info().get("source"),
        Some(&Value::String("warehouse".into()))
    );

    cube.update_data(ChangeLog::new(), info_from([("rev", 5i64)]))
        .unwrap();
    assert_eq!(view.borrow().info().get("rev"), Some(&Value::Int64(5)));
    assert_eq!(
        view.borrow().info().get("source"),
        Some(&Value::String("warehouse".into()))
    );
}

#[test]
fn rows_serialize_to_plain_json() {
    let mut cube = Cube::builder()
        .field(Field::dimension("cat", DataType::String))
        .field(Field::measure("amt", DataType::Int64, AggregatorKind::Sum))
        .build()
        .unwrap();
    cube.load_data(
        vec![
            Record::new(1, vec![Value::String("A".into()), Value::Int64(10)]),
            Record::new(2, vec![Value::String("A".into()), Value::Int64(20)]),
        ],
        Info::new(),
    )
    .unwrap();

    let rows = cube
        .execute_query(QuerySpec::new().dimension("cat"))
        .unwrap();
    let json = serde_json::to_value(&rows).unwrap();

    assert_eq!(
        json,
        serde_json::json!([
            {
                "id": "root>>cat=A",
                "label": "A",
                "dimension": "cat",
                "values": { "amt": 30, "cat": "A" }
            }
        ])
    );
}

#[test]
fn range_aggregator_tracks_min_max() {
    let mut cube = Cube::builder()
        .field(Field::dimension("cat", DataType::String))
        .field(Field::measure("amt", DataType::Int64, AggregatorKind::Range))
        .build()
        .unwrap();
    cube.load_data(
        vec![
            Record::new(1, vec![Value::String("A".into()), Value::Int64(30)]),
            Record::new(2, vec![Value::String("A".into()), Value::Int64(10)]),
            Record::new(3, vec![Value::String("A".into()), Value::Int64(20)]),
        ],
        Info::new(),
    )
    .unwrap();

    let spec = QuerySpec::new().dimension("cat");
    let rows = cube.execute_query(spec.clone()).unwrap();
    assert_eq!(
        rows[0].values.get("amt"),
        Some(&Value::range(Value::Int64(10), Value::Int64(30)))
    );

    // shrinking away the max forces a cell recompute, transparently
    let view = cube.create_view(spec.clone(), true).unwrap();
    cube.update_data(
        ChangeLog::new().update(Record::new(
            1,
            vec![Value::String("A".into()), Value::Int64(15)],
        )),
        Info::new(),
    )
    .unwrap();

    assert_eq!(
        view.borrow().rows()[0].values.get("amt"),
        Some(&Value::range(Value::Int64(10), Value::Int64(20)))
    );
    let fresh = cube.execute_query(spec).unwrap();
    assert_eq!(view.borrow().rows(), &fresh[..]);
}
