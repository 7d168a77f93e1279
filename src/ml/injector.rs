// ============================================================
// Layer 5 — Recurrent Cells and the Embedding Injector
// ============================================================
// A recurrent cell is anything with a state size, an output size
// and a single-step transition (input, state) → (output, state).
//
// EmbeddingInjector wraps such a cell so callers can feed raw
// token ids: each step looks the ids up in the fixed pretrained
// embedding matrix and hands the dense rows to the wrapped cell
// together with the untouched state.
//
//   ids [batch] ──lookup──▶ vectors [batch, width] ──▶ cell.step
//
// Any type implementing RecurrentCell with a dense input can be
// wrapped; a non-cell is rejected by the compiler.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::sigmoid,
};

use crate::domain::error::InjectorError;

// ─── RecurrentCell ────────────────────────────────────────────────────────────
pub trait RecurrentCell<B: Backend> {
    /// What one step consumes
    type Input;

    fn input_size(&self) -> usize;
    fn state_size(&self) -> usize;
    fn output_size(&self) -> usize;

    /// One transition: returns (output [batch, output_size], new state)
    fn step(&self, input: Self::Input, state: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>);

    fn init_state(&self, batch_size: usize, device: &B::Device) -> Tensor<B, 2> {
        Tensor::zeros([batch_size, self.state_size()], device)
    }
}

// ─── GruCell ──────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct GruCellConfig {
    pub input_size:  usize,
    pub hidden_size: usize,
}

impl GruCellConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GruCell<B> {
        GruCell {
            input_gates:  LinearConfig::new(self.input_size, 3 * self.hidden_size).init(device),
            hidden_gates: LinearConfig::new(self.hidden_size, 3 * self.hidden_size).init(device),
            input_size:   self.input_size,
            hidden_size:  self.hidden_size,
        }
    }
}

/// Gated recurrent unit. Gate layout along the last dim: reset, update, candidate.
#[derive(Module, Debug)]
pub struct GruCell<B: Backend> {
    pub input_gates:  Linear<B>,
    pub hidden_gates: Linear<B>,
    pub input_size:   usize,
    pub hidden_size:  usize,
}

impl<B: Backend> RecurrentCell<B> for GruCell<B> {
    type Input = Tensor<B, 2>;

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn state_size(&self) -> usize {
        self.hidden_size
    }

    fn output_size(&self) -> usize {
        self.hidden_size
    }

    fn step(&self, input: Tensor<B, 2>, state: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let h  = self.hidden_size;
        let gi = self.input_gates.forward(input);
        let gh = self.hidden_gates.forward(state.clone());

        let reset  = sigmoid(gi.clone().narrow(1, 0, h) + gh.clone().narrow(1, 0, h));
        let update = sigmoid(gi.clone().narrow(1, h, h) + gh.clone().narrow(1, h, h));
        let candidate = (gi.narrow(1, 2 * h, h) + reset * gh.narrow(1, 2 * h, h)).tanh();

        // h' = (1 - z) * n + z * h
        let keep = update.clone().neg().add_scalar(1.0);
        let next = keep * candidate + update * state;
        (next.clone(), next)
    }
}

// ─── EmbeddingInjector ────────────────────────────────────────────────────────
/// Token-id front end for a dense-input recurrent cell.
#[derive(Debug)]
pub struct EmbeddingInjector<'a, B, C>
where
    B: Backend,
    C: RecurrentCell<B, Input = Tensor<B, 2>>,
{
    cell:       &'a C,
    embeddings: Tensor<B, 2>,
}

impl<'a, B, C> EmbeddingInjector<'a, B, C>
where
    B: Backend,
    C: RecurrentCell<B, Input = Tensor<B, 2>>,
{
    /// Wrap `cell`, checking that the matrix rows are `width` wide and
    /// that the cell consumes vectors of that width.
    pub fn new(cell: &'a C, embeddings: Tensor<B, 2>, width: usize) -> Result<Self, InjectorError> {
        let [rows, cols] = embeddings.dims();
        if rows == 0 {
            return Err(InjectorError::EmptyMatrix);
        }
        if cols != width {
            return Err(InjectorError::WidthMismatch { expected: width, actual: cols });
        }
        if cell.input_size() != width {
            return Err(InjectorError::WidthMismatch { expected: cell.input_size(), actual: width });
        }
        Ok(Self { cell, embeddings })
    }

    /// Wrap without re-checking; the model validates shapes once at init.
    pub(crate) fn from_validated(cell: &'a C, embeddings: Tensor<B, 2>) -> Self {
        Self { cell, embeddings }
    }

    /// Look up rows for a vector of token ids: [batch] → [batch, width]
    pub fn embed(&self, ids: Tensor<B, 1, Int>) -> Tensor<B, 2> {
        self.embeddings.clone().select(0, ids)
    }
}

impl<'a, B, C> RecurrentCell<B> for EmbeddingInjector<'a, B, C>
where
    B: Backend,
    C: RecurrentCell<B, Input = Tensor<B, 2>>,
{
    type Input = Tensor<B, 1, Int>;

    fn input_size(&self) -> usize {
        // consumes one id per batch row
        1
    }

    fn state_size(&self) -> usize {
        self.cell.state_size()
    }

    fn output_size(&self) -> usize {
        self.cell.output_size()
    }

    fn step(&self, ids: Tensor<B, 1, Int>, state: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let embedded = self.embed(ids);
        self.cell.step(embedded, state)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    /// Records what the wrapped cell receives
    #[derive(Debug)]
    struct EchoCell {
        width: usize,
    }

    impl RecurrentCell<TestBackend> for EchoCell {
        type Input = Tensor<TestBackend, 2>;

        fn input_size(&self) -> usize { self.width }
        fn state_size(&self) -> usize { 7 }
        fn output_size(&self) -> usize { self.width }

        fn step(
            &self,
            input: Tensor<TestBackend, 2>,
            state: Tensor<TestBackend, 2>,
        ) -> (Tensor<TestBackend, 2>, Tensor<TestBackend, 2>) {
            (input, state)
        }
    }

    fn matrix() -> Tensor<TestBackend, 2> {
        // row i = [i, 10 * i]
        let device = Default::default();
        Tensor::<TestBackend, 1>::from_floats([0.0, 0.0, 1.0, 10.0, 2.0, 20.0, 3.0, 30.0], &device)
            .reshape([4, 2])
    }

    #[test]
    fn test_step_passes_embedded_rows_and_state() {
        let device   = Default::default();
        let cell     = EchoCell { width: 2 };
        let injector = EmbeddingInjector::new(&cell, matrix(), 2).unwrap();

        let ids   = Tensor::<TestBackend, 1, Int>::from_ints([3, 1], &device);
        let state = Tensor::<TestBackend, 2>::ones([2, 7], &device);
        let (out, new_state) = injector.step(ids, state);

        let out: Vec<f32> = out.into_data().iter::<f32>().collect();
        assert_eq!(out, vec![3.0, 30.0, 1.0, 10.0]);
        let state_sum: f32 = new_state.sum().into_scalar().elem();
        assert_eq!(state_sum, 14.0);
    }

    #[test]
    fn test_sizes_delegate_to_cell() {
        let cell     = EchoCell { width: 2 };
        let injector = EmbeddingInjector::new(&cell, matrix(), 2).unwrap();
        assert_eq!(injector.state_size(), 7);
        assert_eq!(injector.output_size(), 2);
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let cell = EchoCell { width: 2 };
        let err  = EmbeddingInjector::new(&cell, matrix(), 3).unwrap_err();
        assert_eq!(err, InjectorError::WidthMismatch { expected: 3, actual: 2 });

        let narrow_cell = EchoCell { width: 5 };
        let err = EmbeddingInjector::new(&narrow_cell, matrix(), 2).unwrap_err();
        assert_eq!(err, InjectorError::WidthMismatch { expected: 5, actual: 2 });
    }

    #[test]
    fn test_gru_cell_shapes() {
        let device = Default::default();
        let cell: GruCell<TestBackend> = GruCellConfig::new(3, 4).init(&device);

        let input = Tensor::<TestBackend, 2>::ones([2, 3], &device);
        let state = cell.init_state(2, &device);
        let (out, next) = cell.step(input, state);

        assert_eq!(out.dims(), [2, 4]);
        assert_eq!(next.dims(), [2, 4]);
    }
}
