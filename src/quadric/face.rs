//! Per-triangle attribute quadrics.

use std::ops::AddAssign;

use crate::math::{
    scaled_projection, AttrVector, GradientMatrix, InverseGradientProjection, SymmetricMatrix,
    UvBox, Vec3d,
};

use super::{QuadricVertex, WeightLookup, MIN_ATTR_WEIGHT};

/// Squared face-normal length below which a triangle contributes nothing.
const SMALL_NUMBER: f64 = 1.0e-8;

/// Padding applied when clamping the tracked UV channel.
const UV_PADDING: f32 = 0.2;

/// A quadric over the state `(position, dense attributes, sparse attributes)`.
///
/// In block form, with `γ` standing in for the accumulated area:
///
/// ```text
///        | C    B1   B2  |          | d0 |
///   A =  | B1ᵀ  γI   0   |    b  =  | d1 |      Q(s) = <s, A s> + 2 <s, b> + c
///        | B2ᵀ  0    γI  |          | d2 |
/// ```
///
/// The attribute state is scaled by the attribute weights before evaluation.
/// Volume terms (`vol_grad`, `vol_dist`) record the signed volume constraint
/// used by the optimizer, and `uv_box` tracks the support of the first UV
/// channel. The `plane_*` terms keep the geometric part alone for distance
/// queries.
#[derive(Debug, Clone, Default)]
pub struct Quadric<D: AttrVector, S: AttrVector> {
    pub(crate) c: SymmetricMatrix,
    pub(crate) b1: D::Gradient,
    pub(crate) b2: S::Gradient,
    pub(crate) gamma: f64,
    pub(crate) d0: Vec3d,
    pub(crate) d1: D,
    pub(crate) d2: S,
    pub(crate) c_scalar: f64,
    pub(crate) vol_grad: Vec3d,
    pub(crate) vol_dist: f64,
    pub(crate) uv_box: UvBox,
    pub(crate) plane_c: SymmetricMatrix,
    pub(crate) plane_d: Vec3d,
    pub(crate) plane_scalar: f64,
}

impl<D: AttrVector, S: AttrVector> Quadric<D, S> {
    /// The zero quadric.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Build the area-weighted quadric of the triangle `(v0, v1, v2)`.
    ///
    /// Triangles whose normal is too short to normalize yield the zero
    /// quadric. If the gradient solver fails the attributes are modeled as
    /// constant at their weighted average.
    pub fn from_face<V, W1, W2>(v0: &V, v1: &V, v2: &V, dense_weights: &W1, sparse_weights: &W2) -> Self
    where
        V: QuadricVertex<Dense = D, Sparse = S>,
        W1: WeightLookup,
        W2: WeightLookup,
    {
        let p0 = v0.position();
        let p1 = v1.position();
        let p2 = v2.position();

        let mut normal = (p2 - p0).cross(&(p1 - p0));
        let length_sqr = normal.norm_squared();
        if length_sqr < SMALL_NUMBER {
            return Self::zero();
        }
        let length = length_sqr.sqrt();
        normal /= length;
        let area = 0.5 * length;

        let dist = -normal.dot(&p0);

        let mut q = Self {
            c: scaled_projection(&normal),
            d0: normal * dist,
            c_scalar: dist * dist,
            vol_grad: normal / 3.0,
            vol_dist: dist / 3.0,
            plane_c: scaled_projection(&normal),
            plane_d: normal * dist,
            plane_scalar: dist * dist,
            ..Self::zero()
        };

        let tool = InverseGradientProjection::new(&p0, &p1, &p2, &normal);

        q.uv_box.expand(&v0.primary_uv());
        q.uv_box.expand(&v1.primary_uv());
        q.uv_box.expand(&v2.primary_uv());

        let (a0, a1, a2) = (v0.dense_attributes(), v1.dense_attributes(), v2.dense_attributes());
        let has_gradients = encode_attr_gradient(&tool, &a0, &a1, &a2, dense_weights, &mut q.b1, &mut q.d1);
        q.c_scalar += q.d1.norm_squared();
        if has_gradients {
            sum_outer_products(&q.b1, &q.d1, &mut q.c, &mut q.d0);
        }

        let has_gradients = encode_attr_gradient(
            &tool,
            v0.sparse_attributes(),
            v1.sparse_attributes(),
            v2.sparse_attributes(),
            sparse_weights,
            &mut q.b2,
            &mut q.d2,
        );
        q.c_scalar += q.d2.norm_squared();
        if has_gradients {
            sum_outer_products(&q.b2, &q.d2, &mut q.c, &mut q.d0);
        }

        q.gamma = area;
        q.weight_by_area(area);
        q
    }

    /// Accumulated area.
    #[inline]
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Support of the tracked UV channel.
    #[inline]
    pub fn uv_box(&self) -> &UvBox {
        &self.uv_box
    }

    /// Area-weighted mean squared distance from `pos` to the planes of the
    /// accumulated triangles. Zero for a quadric with no area.
    pub fn distance_sqr(&self, pos: &Vec3d) -> f64 {
        if self.gamma <= 0.0 {
            return 0.0;
        }
        let sum = pos.dot(&(self.plane_c * *pos)) + 2.0 * pos.dot(&self.plane_d) + self.plane_scalar;
        (sum / self.gamma).max(0.0)
    }

    /// Error of `vertex` measured by this quadric.
    pub fn evaluate<V, W1, W2>(&self, vertex: &V, dense_weights: &W1, sparse_weights: &W2) -> f64
    where
        V: QuadricVertex<Dense = D, Sparse = S>,
        W1: WeightLookup,
        W2: WeightLookup,
    {
        let pos = vertex.position();
        let s1 = scale_by_weights(&vertex.dense_attributes(), dense_weights);
        let s2 = scale_by_weights(vertex.sparse_attributes(), sparse_weights);
        self.evaluate_state(&pos, &s1, &s2)
    }

    /// Error of the weight-scaled state `(pos, s1, s2)`.
    pub fn evaluate_state(&self, pos: &Vec3d, s1: &D, s2: &S) -> f64 {
        let quadratic = pos.dot(&(self.c * *pos))
            + 2.0 * pos.dot(&(self.b1.mul_vec(s1) + self.b2.mul_vec(s2)))
            + self.gamma * (s1.norm_squared() + s2.norm_squared());

        let linear = 2.0 * (pos.dot(&self.d0) + s1.dot(&self.d1) + s2.dot(&self.d2));

        quadratic + linear + self.c_scalar
    }

    /// Replace the attributes of `vertex` with the values that minimize this
    /// quadric at the vertex's current position.
    ///
    /// The tracked UV channel is clamped to the padded UV support. A quadric
    /// with no accumulated area leaves the vertex untouched.
    pub fn calc_attributes<V, W1, W2>(&self, vertex: &mut V, dense_weights: &W1, sparse_weights: &W2)
    where
        V: QuadricVertex<Dense = D, Sparse = S>,
        W1: WeightLookup,
        W2: WeightLookup,
    {
        if self.gamma <= 0.0 {
            return;
        }
        let pos = vertex.position();

        let dense = compute_attrs(self.gamma, &self.b1, &self.d1, &pos, dense_weights);
        vertex.set_dense_attributes(&dense);

        if self.uv_box.is_valid() {
            self.uv_box.clamp_padded(vertex.primary_uv_mut(), UV_PADDING);
        }

        let sparse = compute_attrs(self.gamma, &self.b2, &self.d2, &pos, sparse_weights);
        vertex.set_sparse_attributes(sparse);
    }

    fn weight_by_area(&mut self, area: f64) {
        self.c *= area;
        self.b1 *= area;
        self.b2 *= area;
        self.d0 *= area;
        self.d1 *= area;
        self.d2 *= area;
        self.c_scalar *= area;
        self.vol_grad *= area;
        self.vol_dist *= area;
        self.plane_c *= area;
        self.plane_d *= area;
        self.plane_scalar *= area;
    }
}

impl<'a, D: AttrVector, S: AttrVector> AddAssign<&'a Quadric<D, S>> for Quadric<D, S> {
    fn add_assign(&mut self, rhs: &'a Quadric<D, S>) {
        self.c += rhs.c;
        self.b1 += &rhs.b1;
        self.b2 += &rhs.b2;
        self.d0 += rhs.d0;
        self.d1 += &rhs.d1;
        self.d2 += &rhs.d2;
        self.c_scalar += rhs.c_scalar;
        self.gamma += rhs.gamma;
        self.vol_grad += rhs.vol_grad;
        self.vol_dist += rhs.vol_dist;
        self.uv_box += &rhs.uv_box;
        self.plane_c += rhs.plane_c;
        self.plane_d += rhs.plane_d;
        self.plane_scalar += rhs.plane_scalar;
    }
}

/// Fill `grad` with `-g_i` and `dist` with `-d_i` for every weighted
/// attribute. Returns false when the triangle is too degenerate for gradients,
/// in which case each attribute is modeled by its weighted average.
fn encode_attr_gradient<A: AttrVector, W: WeightLookup>(
    tool: &InverseGradientProjection,
    a0: &A,
    a1: &A,
    a2: &A,
    weights: &W,
    grad: &mut A::Gradient,
    dist: &mut A,
) -> bool {
    let mask = A::iteration_mask(a0, a1, a2);

    grad.reset();
    dist.reset();
    for &i in &mask {
        grad.set_column(i, Vec3d::zeros());
        dist.set_element(i, 0.0);
    }

    let valid = tool.is_valid();
    for &i in &mask {
        let w = weights.weight(i);
        if w < MIN_ATTR_WEIGHT {
            continue;
        }
        let per_vertex = Vec3d::new(a0.element(i), a1.element(i), a2.element(i)) * w;

        if valid {
            let (g, d) = tool.compute_gradient(&per_vertex);
            grad.set_column(i, -g);
            dist.set_element(i, -d);
        } else {
            let average = (per_vertex[0] + per_vertex[1] + per_vertex[2]) / 3.0;
            dist.set_element(i, -average);
        }
    }
    valid
}

/// `C += Σ bᵢ bᵢᵀ`, `d0 += Σ dᵢ bᵢ`.
fn sum_outer_products<A: AttrVector>(
    grad: &A::Gradient,
    dist: &A,
    c: &mut SymmetricMatrix,
    d0: &mut Vec3d,
) {
    grad.for_each_column(|i, column| {
        *d0 += column * dist.element(i);
        *c += scaled_projection(column);
    });
}

/// `aᵢ = -(<p, bᵢ> + dᵢ) / (wᵢ γ)`, zero for switched off attributes.
fn compute_attrs<A: AttrVector, W: WeightLookup>(
    gamma: f64,
    grad: &A::Gradient,
    dist: &A,
    pos: &Vec3d,
    weights: &W,
) -> A {
    let mut attrs = A::default();
    grad.for_each_column(|i, column| {
        let w = weights.weight(i);
        let value = if w < MIN_ATTR_WEIGHT {
            0.0
        } else {
            (pos.dot(column) + dist.element(i)) / (w * gamma)
        };
        attrs.set_element(i, -value);
    });
    attrs
}

fn scale_by_weights<A: AttrVector, W: WeightLookup>(attrs: &A, weights: &W) -> A {
    let mut scaled = attrs.clone();
    for i in attrs.support() {
        scaled.set_element(i, attrs.element(i) * weights.weight(i));
    }
    scaled
}
