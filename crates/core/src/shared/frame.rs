use ndarray::ArrayView3;

/// Channel order of a three-channel raster.
///
/// Cameras deliver `Bgr`; the presentation layer expects `Rgb`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorOrder {
    Bgr,
    Rgb,
}

/// Where row 0 of the buffer sits in the captured picture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameOrigin {
    #[default]
    TopLeft,
    BottomLeft,
}

/// A single camera frame: contiguous 8-bit pixels in row-major order.
///
/// The processor mutates frames in place (flip, colour conversion, overlay
/// drawing) but never changes their dimensions.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
    order: ColorOrder,
    origin: FrameOrigin,
}

impl Frame {
    /// Creates a capture-order (`Bgr`, top-left origin) frame.
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
            order: ColorOrder::Bgr,
            origin: FrameOrigin::TopLeft,
        }
    }

    /// Creates a black frame of the given size.
    pub fn black(width: u32, height: u32, index: usize) -> Self {
        Self::new(vec![0; (width * height * 3) as usize], width, height, 3, index)
    }

    pub fn with_order(mut self, order: ColorOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_origin(mut self, origin: FrameOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn order(&self) -> ColorOrder {
        self.order
    }

    pub fn origin(&self) -> FrameOrigin {
        self.origin
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Swaps the first and third channel of every pixel, toggling between
    /// `Bgr` and `Rgb`.
    pub fn swap_red_blue(&mut self) {
        if self.channels >= 3 {
            let step = self.channels as usize;
            for px in self.data.chunks_exact_mut(step) {
                px.swap(0, 2);
            }
        }
        self.order = match self.order {
            ColorOrder::Bgr => ColorOrder::Rgb,
            ColorOrder::Rgb => ColorOrder::Bgr,
        };
    }

    /// Mirrors rows top-to-bottom in place.
    pub fn flip_vertical(&mut self) {
        let row_len = self.row_len();
        let h = self.height as usize;
        for row in 0..h / 2 {
            let (top, bottom) = self.data.split_at_mut((h - 1 - row) * row_len);
            top[row * row_len..(row + 1) * row_len].swap_with_slice(&mut bottom[..row_len]);
        }
        self.origin = match self.origin {
            FrameOrigin::TopLeft => FrameOrigin::BottomLeft,
            FrameOrigin::BottomLeft => FrameOrigin::TopLeft,
        };
    }

    /// Mirrors columns left-to-right in place.
    pub fn flip_horizontal(&mut self) {
        let row_len = self.row_len();
        let channels = self.channels as usize;
        let w = self.width as usize;
        for row in self.data.chunks_exact_mut(row_len) {
            for col in 0..w / 2 {
                let left = col * channels;
                let right = (w - 1 - col) * channels;
                for c in 0..channels {
                    row.swap(left + c, right + c);
                }
            }
        }
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    fn row_len(&self) -> usize {
        self.width as usize * self.channels as usize
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
