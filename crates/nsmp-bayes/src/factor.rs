//! Dense tabular factors over discrete variables.
//!
//! A factor maps every joint assignment of its scope to a non-negative value.
//! Values are stored row-major with the last scope variable varying fastest,
//! which makes a stored CPD table a factor over `[child, parents..]`
//! without any reordering.

use crate::network::Network;

#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    scope: Vec<usize>,
    cards: Vec<usize>,
    values: Vec<f64>,
}

impl Factor {
    /// A factor over `scope` with the given cardinalities.
    ///
    /// # Panics
    ///
    /// Panics if `values` does not have one entry per joint assignment.
    #[must_use]
    pub fn new(scope: Vec<usize>, cards: Vec<usize>, values: Vec<f64>) -> Self {
        assert_eq!(scope.len(), cards.len(), "scope and cardinalities differ");
        assert_eq!(
            values.len(),
            cards.iter().product::<usize>(),
            "factor table size does not match its scope"
        );
        Self {
            scope,
            cards,
            values,
        }
    }

    /// The CPD of variable `var` as a factor over `[var, parents..]`.
    #[must_use]
    pub fn from_cpd(network: &Network, var: usize) -> Self {
        let variable = &network.variables()[var];
        let parents = network.parents_of(var);
        let mut scope = Vec::with_capacity(parents.len() + 1);
        scope.push(var);
        scope.extend_from_slice(parents);
        let cards = scope
            .iter()
            .map(|&v| network.variables()[v].cardinality())
            .collect();
        let values = variable.cpd.iter().flatten().copied().collect();
        Self::new(scope, cards, values)
    }

    #[must_use]
    pub fn scope(&self) -> &[usize] {
        &self.scope
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn contains(&self, var: usize) -> bool {
        self.scope.contains(&var)
    }

    fn strides(&self) -> Vec<usize> {
        strides(&self.cards)
    }

    /// Fixes `var` to `state` and drops it from the scope.
    ///
    /// Returns a clone when `var` is not in scope.
    #[must_use]
    pub fn reduce(&self, var: usize, state: usize) -> Self {
        let Some(pos) = self.scope.iter().position(|&v| v == var) else {
            return self.clone();
        };
        let src_strides = self.strides();
        let offset = state * src_strides[pos];

        let mut scope = self.scope.clone();
        let mut cards = self.cards.clone();
        let mut kept_strides = src_strides;
        scope.remove(pos);
        cards.remove(pos);
        kept_strides.remove(pos);

        let mut values = Vec::with_capacity(cards.iter().product());
        walk(&cards, &kept_strides, &[], |_, src, _| {
            values.push(self.values[offset + src]);
        });
        Self {
            scope,
            cards,
            values,
        }
    }

    /// Pointwise product over the union of both scopes.
    ///
    /// The result scope is `self`'s scope followed by the variables only in
    /// `other`.
    #[must_use]
    pub fn product(&self, other: &Self) -> Self {
        let mut scope = self.scope.clone();
        let mut cards = self.cards.clone();
        for (&v, &c) in other.scope.iter().zip(&other.cards) {
            if !scope.contains(&v) {
                scope.push(v);
                cards.push(c);
            }
        }

        let strides_in = |factor: &Self| {
            let own = factor.strides();
            scope
                .iter()
                .map(|v| factor.scope.iter().position(|w| w == v).map_or(0, |p| own[p]))
                .collect::<Vec<_>>()
        };
        let a_strides = strides_in(self);
        let b_strides = strides_in(other);

        let mut values = Vec::with_capacity(cards.iter().product());
        walk(&cards, &a_strides, &b_strides, |_, a, b| {
            values.push(self.values[a] * other.values[b]);
        });
        Self {
            scope,
            cards,
            values,
        }
    }

    /// Marginalizes `var` out of the factor.
    ///
    /// Returns a clone when `var` is not in scope.
    #[must_use]
    pub fn sum_out(&self, var: usize) -> Self {
        let Some(pos) = self.scope.iter().position(|&v| v == var) else {
            return self.clone();
        };
        let mut scope = self.scope.clone();
        let mut cards = self.cards.clone();
        scope.remove(pos);
        cards.remove(pos);

        let mut dst_strides = strides(&cards);
        dst_strides.insert(pos, 0);

        let mut values = vec![0.0; cards.iter().product()];
        walk(&self.cards, &dst_strides, &[], |src, dst, _| {
            values[dst] += self.values[src];
        });
        Self {
            scope,
            cards,
            values,
        }
    }

    /// Sum of all entries.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

/// Row-major strides, last dimension contiguous.
fn strides(cards: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; cards.len()];
    for i in (0..cards.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * cards[i + 1];
    }
    strides
}

/// Visits every assignment of `cards` in row-major order.
///
/// `f` receives the flat index of the assignment and its offsets under
/// `a_strides` and `b_strides`. An empty stride slice yields offset 0.
fn walk<F>(cards: &[usize], a_strides: &[usize], b_strides: &[usize], mut f: F)
where
    F: FnMut(usize, usize, usize),
{
    let stride = |strides: &[usize], i: usize| strides.get(i).copied().unwrap_or(0);
    let total: usize = cards.iter().product();
    let mut assignment = vec![0; cards.len()];
    let (mut a, mut b) = (0, 0);
    for flat in 0..total {
        f(flat, a, b);
        for i in (0..cards.len()).rev() {
            assignment[i] += 1;
            a += stride(a_strides, i);
            b += stride(b_strides, i);
            if assignment[i] < cards[i] {
                break;
            }
            a -= stride(a_strides, i) * cards[i];
            b -= stride(b_strides, i) * cards[i];
            assignment[i] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::testing::sample_network;

    #[test]
    fn test_strides() {
        assert_eq!(strides(&[2, 3, 4]), [12, 4, 1]);
        assert_eq!(strides(&[]), Vec::<usize>::new());
    }

    #[test]
    fn test_from_cpd_layout() {
        let network = sample_network();
        let recidiva = network.index_of("recidiva").unwrap();
        let factor = Factor::from_cpd(&network, recidiva);
        // [recidiva, grado_histologi, edad]
        assert_eq!(factor.scope(), [2, 1, 0]);
        // recidiva = 1, grado = "2.0", edad = "1.0"
        assert_eq!(factor.values()[9 + 3 + 1], 0.4);
    }

    #[test]
    fn test_reduce() {
        let f = Factor::new(vec![0, 1], vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let r = f.reduce(1, 2);
        assert_eq!(r.scope(), [0]);
        assert_eq!(r.values(), [3.0, 6.0]);
        let r = f.reduce(0, 1);
        assert_eq!(r.scope(), [1]);
        assert_eq!(r.values(), [4.0, 5.0, 6.0]);
        assert_eq!(f.reduce(7, 0), f);
    }

    #[test]
    fn test_sum_out() {
        let f = Factor::new(vec![0, 1], vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(f.sum_out(0).values(), [5.0, 7.0, 9.0]);
        assert_eq!(f.sum_out(1).values(), [6.0, 15.0]);
        let scalar = f.sum_out(0).sum_out(1);
        assert!(scalar.scope().is_empty());
        assert_eq!(scalar.values(), [21.0]);
    }

    #[test]
    fn test_product_aligns_shared_variables() {
        // f(a, b) and g(b, c)
        let f = Factor::new(vec![0, 1], vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]);
        let g = Factor::new(vec![1, 2], vec![2, 3], vec![1.0, 10.0, 100.0, 2.0, 20.0, 200.0]);
        let h = f.product(&g);
        assert_eq!(h.scope(), [0, 1, 2]);
        // h(a=1, b=1, c=2) = f(1,1) * g(1,2) = 4 * 200
        assert_eq!(h.values()[6 + 3 + 2], 800.0);
        // h(a=0, b=1, c=0) = f(0,1) * g(1,0) = 2 * 2
        assert_eq!(h.values()[3], 4.0);
        assert_relative_eq!(h.total(), product_total(&f, &g));
    }

    fn product_total(f: &Factor, g: &Factor) -> f64 {
        // sum_{a,b,c} f(a,b) g(b,c) = sum_b (sum_a f(a,b)) (sum_c g(b,c))
        let fb = f.sum_out(0);
        let gb = g.sum_out(2);
        fb.values().iter().zip(gb.values()).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_product_with_scalar() {
        let f = Factor::new(vec![3], vec![2], vec![0.25, 0.75]);
        let s = Factor::new(vec![], vec![], vec![2.0]);
        assert_eq!(s.product(&f).values(), [0.5, 1.5]);
        assert_eq!(f.product(&s).values(), [0.5, 1.5]);
    }
}
