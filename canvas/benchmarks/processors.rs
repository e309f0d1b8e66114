use brunch::Bench;

use pixelflow::processing::{
    ColorMatrixProcessor, EdgeDetection, EdgeDetector, ErrorDiffuser, ErrorDiffusion, GaussianBlur,
    GrayscaleMode, ImageProcessor, Invert, OrderedDither, OrderedDitherMatrix, Quantization,
    QuantizeProcessor,
};
use pixelflow::{Image, ProcessingError, Rgba32};

struct Apply {
    name: &'static str,
    processor: Box<dyn ImageProcessor<Rgba32>>,
    sz: usize,
}

impl Apply {
    fn name(&self) -> String {
        format!("{}({}x{})", self.name, self.sz, self.sz)
    }

    fn prepare(self) -> Result<impl FnMut(), ProcessingError> {
        let mut image = Image::<Rgba32>::new(self.sz, self.sz);
        for y in 0..self.sz {
            for x in 0..self.sz {
                let v = ((x ^ y) & 0xff) as u8;
                image.root_mut()[(x, y)] = Rgba32::rgb(v, v.wrapping_mul(3), 255 - v);
            }
        }

        // Fail early instead of benchmarking the error path.
        image.clone().apply(&*self.processor)?;

        let processor = self.processor;
        Ok(move || {
            let mut copy = image.clone();
            let _ = copy.apply(&*processor);
        })
    }
}

fn main() {
    let tests = [
        Apply {
            name: "invert",
            processor: Box::new(Invert),
            sz: 256,
        },
        Apply {
            name: "grayscale",
            processor: Box::new(ColorMatrixProcessor::grayscale(GrayscaleMode::Bt709)),
            sz: 256,
        },
        Apply {
            name: "hue",
            processor: Box::new(ColorMatrixProcessor::hue(90.0)),
            sz: 256,
        },
        Apply {
            name: "gaussian_blur",
            processor: Box::new(GaussianBlur::default()),
            sz: 128,
        },
        Apply {
            name: "sobel",
            processor: Box::new(EdgeDetector::new(EdgeDetection::Sobel)),
            sz: 128,
        },
        Apply {
            name: "bayer8x8",
            processor: Box::new(OrderedDither::new(OrderedDitherMatrix::Bayer8x8)),
            sz: 256,
        },
        Apply {
            name: "floyd_steinberg",
            processor: Box::new(ErrorDiffusion::new(ErrorDiffuser::FloydSteinberg, 0.5)),
            sz: 256,
        },
        Apply {
            name: "octree",
            processor: Box::new(QuantizeProcessor::new(Quantization::Octree, 256)),
            sz: 128,
        },
        Apply {
            name: "wu",
            processor: Box::new(QuantizeProcessor::new(Quantization::Wu, 256)),
            sz: 128,
        },
    ];

    let mut benches = brunch::Benches::default();
    benches.extend(tests.map(|apply| {
        let name = apply.name();
        let bench = match apply.prepare() {
            Ok(bench) => bench,
            Err(err) => panic!("Failed to setup benchmark {}: {:?}", name, err),
        };

        Bench::new(format!("pixelflow::processors::{}", name)).run(bench)
    }));
    benches.finish();
}
