use nalgebra::{DMatrix, DVector};

use crate::scalar::Scalar;

/// A Butcher tableau for an embedded Runge-Kutta pair.
///
/// The tableau is defined by the matrix `a`, the weight vectors `b` and `c`,
/// and `d`, the difference between the main and embedded weights used for
/// error control:
///
/// ```text
/// c1 | a11 0   0
/// c2 | a21 a22 0
/// c3 | a31 a32 a33
/// -------------------
///    | b1  b2  b3
///    | be1 be2 be3
/// -------------------
///    | d1  d2  d3
/// ```
///
/// Methods with a continuous extension also carry a `beta` matrix: the dense
/// output at `theta` in `[0, 1]` weights the stages by
/// `beta * [theta, theta^2, ...]`.
#[derive(Clone, Debug)]
pub struct Tableau<T: Scalar> {
    a: DMatrix<T>,
    b: DVector<T>,
    c: DVector<T>,
    d: DVector<T>,
    order: usize,
    beta: Option<DMatrix<T>>,
}

impl<T: Scalar> Tableau<T> {
    /// Tsitouras' 5(4) pair, from C. Tsitouras, Runge-Kutta pairs of order
    /// 5(4) satisfying only the first column simplifying assumption,
    /// Computers & Mathematics with Applications 62 (2011) 770-775.
    ///
    /// Seven stages, first-same-as-last, with a free 4th order interpolant.
    pub fn tsit45() -> Self {
        let c = DVector::from_column_slice(&[
            0.0,
            0.161,
            0.327,
            0.9,
            0.9800255409045097,
            1.0,
            1.0,
        ]);

        let b = DVector::from_column_slice(&[
            0.09646076681806523,
            0.01,
            0.4798896504144996,
            1.379008574103742,
            -3.290069515436081,
            2.324710524099774,
            0.0,
        ]);

        let d = DVector::from_column_slice(&[
            -0.001780011052225777,
            -0.0008164344596567469,
            0.007880878010261995,
            -0.1447110071732629,
            0.5823571654525552,
            -0.45808210592918697,
            0.015151515151515152,
        ]);

        // first column follows from the row-sum condition a(i, 0) = c(i) - sum(a(i, 1..i)),
        // and the last row equals b so the final stage evaluates the step result
        let mut a = DMatrix::zeros(7, 7);
        a[(2, 1)] = 0.335480655492357;
        a[(3, 1)] = -6.359448489975075;
        a[(4, 1)] = -11.74888356406283;
        a[(5, 1)] = -12.92096931784711;
        a[(3, 2)] = 4.362295432869581;
        a[(4, 2)] = 7.495539342889836;
        a[(5, 2)] = 8.159367898576159;
        a[(4, 3)] = -0.09249506636175525;
        a[(5, 3)] = -0.071584973281401;
        a[(5, 4)] = -0.02826905039406838;
        for i in 1..6 {
            let mut a_sum = 0.0;
            for j in 1..i {
                a_sum += a[(i, j)];
            }
            a[(i, 0)] = c[i] - a_sum;
        }
        for j in 0..6 {
            a[(6, j)] = b[j];
        }

        // stage polynomials of the interpolant, columns are the weights of
        // theta, theta^2, theta^3 and theta^4
        let beta = DMatrix::from_column_slice(
            7,
            4,
            &[
                1.0,
                0.0,
                0.0,
                0.0,
                0.0,
                0.0,
                0.0,
                -2.76370619727483,
                0.1317,
                3.93029623689475,
                -12.4110771669337,
                37.509313416511,
                -27.8965262891973,
                1.5,
                2.91325546182191,
                -0.2234,
                -5.9410338721315,
                30.3381886302823,
                -88.1789048947664,
                65.0918946747937,
                -4.0,
                -1.05308849772902,
                0.1017,
                2.49062728565125,
                -16.5481028892449,
                47.3795219628193,
                -34.8706578614966,
                2.5,
            ],
        );

        let order = 4;
        Self::new(
            a.map(|v| T::from_f64(v).unwrap()),
            b.map(|v| T::from_f64(v).unwrap()),
            c.map(|v| T::from_f64(v).unwrap()),
            d.map(|v| T::from_f64(v).unwrap()),
            order,
            Some(beta.map(|v| T::from_f64(v).unwrap())),
        )
    }

    pub fn new(
        a: DMatrix<T>,
        b: DVector<T>,
        c: DVector<T>,
        d: DVector<T>,
        order: usize,
        beta: Option<DMatrix<T>>,
    ) -> Self {
        let s = c.len();
        assert_eq!(a.nrows(), s, "Invalid number of rows in a, expected {s}");
        assert_eq!(a.ncols(), s, "Invalid number of columns in a, expected {s}");
        assert_eq!(b.len(), s, "Invalid number of elements in b, expected {s}");
        assert_eq!(d.len(), s, "Invalid number of elements in d, expected {s}");
        if let Some(beta) = &beta {
            assert_eq!(
                beta.nrows(),
                s,
                "Invalid number of rows in beta, expected {s}",
            );
        }
        Self {
            a,
            b,
            c,
            d,
            order,
            beta,
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of stages.
    pub fn s(&self) -> usize {
        self.c.len()
    }

    pub fn a(&self) -> &DMatrix<T> {
        &self.a
    }

    pub fn b(&self) -> &DVector<T> {
        &self.b
    }

    pub fn c(&self) -> &DVector<T> {
        &self.c
    }

    pub fn d(&self) -> &DVector<T> {
        &self.d
    }

    pub fn beta(&self) -> Option<&DMatrix<T>> {
        self.beta.as_ref()
    }
}
