//! Derive runtime filters from one equi-join condition of a hash join.

use rfgen_core::config::RuntimeFilterConfig;
use rfgen_core::error::{Error, Result};
use rfgen_core::expr::{ColumnRef, ScalarExpr, EQ_FUNC};
use rfgen_core::id::FilterIdSource;

use super::filter::RuntimeFilter;
use crate::physical::HashJoin;

/// Build one unassigned filter per enabled type for `eq_predicate`.
///
/// The predicate argument on the join's build side becomes the single source
/// expression. The other argument's column unique id is returned so the
/// caller can look for a scan that produces it.
pub fn generate<G>(
    id_gen: &mut G,
    eq_predicate: &ScalarExpr,
    build_join: &HashJoin,
    cfg: &RuntimeFilterConfig,
) -> Result<(Vec<RuntimeFilter>, i64)>
where
    G: FilterIdSource + ?Sized,
{
    let (left, right) = equi_join_columns(eq_predicate)?;
    let (source, target) = if build_join.right_is_build_side() {
        (right, left)
    } else {
        (left, right)
    };

    let filters = cfg
        .types
        .iter()
        .map(|&rf_type| {
            RuntimeFilter::new(
                id_gen.next_filter_id(),
                build_join.id,
                vec![source.clone()],
                rf_type,
            )
        })
        .collect();
    Ok((filters, target.unique_id))
}

/// Split `eq(a, b)` into its two column arguments.
pub fn equi_join_columns(pred: &ScalarExpr) -> Result<(&ColumnRef, &ColumnRef)> {
    let args = pred
        .function_args(EQ_FUNC)
        .filter(|args| args.len() == 2)
        .ok_or_else(|| {
            Error::TypeMismatch(format!(
                "equi-join condition must be a two-argument {EQ_FUNC}(), got {pred}"
            ))
        })?;

    Ok((column_arg(&args[0], pred)?, column_arg(&args[1], pred)?))
}

fn column_arg<'a>(arg: &'a ScalarExpr, pred: &ScalarExpr) -> Result<&'a ColumnRef> {
    arg.as_column().ok_or_else(|| {
        Error::TypeMismatch(format!(
            "equi-join argument {arg} of {pred} is not a column reference"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physical::{BuildSide, JoinType};
    use rfgen_core::config::{RuntimeFilterMode, RuntimeFilterType};
    use rfgen_core::expr::Literal;
    use rfgen_core::id::{FilterId, IdGenerator, OpId, SharedIdGenerator};
    use rfgen_core::schema::DataType;

    fn t1_k1() -> ColumnRef {
        ColumnRef::new(1, "t1", "k1", DataType::Int64)
    }

    fn t2_k1() -> ColumnRef {
        ColumnRef::new(2, "t2", "k1", DataType::Int64)
    }

    fn join(build_side: BuildSide) -> HashJoin {
        HashJoin::new(
            OpId::new(2),
            OpId::new(0),
            OpId::new(1),
            JoinType::Inner,
            build_side,
            vec![ScalarExpr::eq_columns(t1_k1(), t2_k1())],
        )
    }

    fn cfg(types: Vec<RuntimeFilterType>) -> RuntimeFilterConfig {
        RuntimeFilterConfig {
            types,
            ..Default::default()
        }
    }

    #[test]
    fn right_build_side_sources_right_argument() {
        let j = join(BuildSide::Right);
        let mut ids = IdGenerator::new();
        let (filters, target) =
            generate(&mut ids, &j.eq_conditions[0], &j, &cfg(vec![RuntimeFilterType::In]))
                .unwrap();

        assert_eq!(filters.len(), 1);
        let rf = &filters[0];
        assert_eq!(rf.source_exprs(), &[t2_k1()]);
        assert!(rf.target_exprs().is_empty());
        assert_eq!(rf.mode(), None);
        assert_eq!(rf.build().op_id(), OpId::new(2));
        assert!(rf.build().is_live());
        assert_eq!(target, t1_k1().unique_id);
    }

    #[test]
    fn left_build_side_sources_left_argument() {
        let j = join(BuildSide::Left);
        let mut ids = IdGenerator::new();
        let (filters, target) =
            generate(&mut ids, &j.eq_conditions[0], &j, &cfg(vec![RuntimeFilterType::In]))
                .unwrap();
        assert_eq!(filters[0].source_exprs(), &[t1_k1()]);
        assert_eq!(target, t2_k1().unique_id);
    }

    #[test]
    fn one_filter_per_enabled_type_in_config_order() {
        let j = join(BuildSide::Right);
        let mut ids = IdGenerator::with_baseline(10);
        let types = vec![RuntimeFilterType::MinMax, RuntimeFilterType::In];
        let (filters, _) = generate(&mut ids, &j.eq_conditions[0], &j, &cfg(types)).unwrap();

        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].filter_type(), RuntimeFilterType::MinMax);
        assert_eq!(filters[1].filter_type(), RuntimeFilterType::In);
        assert_eq!(filters[0].id(), FilterId::new(10));
        assert_eq!(filters[1].id(), FilterId::new(11));
        for rf in &filters {
            assert_eq!(rf.source_exprs().len(), 1);
            assert_eq!(rf.mode(), None::<RuntimeFilterMode>);
        }
    }

    #[test]
    fn no_enabled_types_yields_no_filters() {
        let j = join(BuildSide::Right);
        let mut ids = IdGenerator::new();
        let (filters, _) = generate(&mut ids, &j.eq_conditions[0], &j, &cfg(vec![])).unwrap();
        assert!(filters.is_empty());
        assert_eq!(ids.peek(), FilterId::new(0));
    }

    #[test]
    fn shared_generator_can_drive_generation() {
        let j = join(BuildSide::Right);
        let shared = SharedIdGenerator::new();
        let mut src = &shared;
        let (first, _) =
            generate(&mut src, &j.eq_conditions[0], &j, &cfg(vec![RuntimeFilterType::In])).unwrap();
        let (second, _) =
            generate(&mut src, &j.eq_conditions[0], &j, &cfg(vec![RuntimeFilterType::In])).unwrap();
        assert!(first[0].id() < second[0].id());
    }

    #[test]
    fn non_column_argument_is_a_type_mismatch() {
        let j = join(BuildSide::Right);
        let pred = ScalarExpr::Function {
            name: EQ_FUNC.into(),
            args: vec![
                ScalarExpr::Column(t1_k1()),
                ScalarExpr::Literal(Literal::I64(3)),
            ],
        };
        let mut ids = IdGenerator::new();
        let err = generate(&mut ids, &pred, &j, &cfg(vec![RuntimeFilterType::In])).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)));
    }

    #[test]
    fn non_equality_is_a_type_mismatch() {
        let pred = ScalarExpr::Function {
            name: "gt".into(),
            args: vec![ScalarExpr::Column(t1_k1()), ScalarExpr::Column(t2_k1())],
        };
        assert!(matches!(
            equi_join_columns(&pred),
            Err(Error::TypeMismatch(_))
        ));

        let unary = ScalarExpr::Function {
            name: EQ_FUNC.into(),
            args: vec![ScalarExpr::Column(t1_k1())],
        };
        assert!(equi_join_columns(&unary).is_err());
    }
}
