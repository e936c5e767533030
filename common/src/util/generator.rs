use rand::Rng;
use std::fs::File;
use std::io::{BufWriter, Write};

pub struct GeneratorParams {
    pub nets: usize,
    pub max_segments_per_net: usize,
    pub die_width: f64,
    pub die_height: f64,
    pub layers: u8,
    pub blockages: usize,
}

/// Writes a random segment list. Every net is a chain of terminals, each hop
/// becoming one `SEG` record, so consecutive segments of a net share an endpoint.
pub fn generate_random_segments(filename: &str, params: &GeneratorParams) -> std::io::Result<()> {
    let file = File::create(filename)?;
    let mut out = BufWriter::new(file);
    let mut rng = rand::thread_rng();

    let layers = params.layers.max(1);
    let w = params.die_width.max(10.0);
    let h = params.die_height.max(10.0);

    log::info!(
        "Generating Benchmark: {} nets, Die: {:.0}x{:.0}, {} layers",
        params.nets,
        w,
        h,
        layers
    );

    writeln!(out, "# generated benchmark")?;
    writeln!(out, "DIE 0 0 {:.0} {:.0}", w, h)?;
    for l in 0..layers {
        writeln!(out, "LAYER M{}", l + 1)?;
    }

    for _ in 0..params.blockages {
        let bw = rng.gen_range(w * 0.01..w * 0.05);
        let bh = rng.gen_range(h * 0.01..h * 0.05);
        let x = rng.gen_range(0.0..(w - bw));
        let y = rng.gen_range(0.0..(h - bh));
        let layer = rng.gen_range(0..layers);
        writeln!(
            out,
            "BLOCK M{} {:.0} {:.0} {:.0} {:.0}",
            layer + 1,
            x,
            y,
            x + bw,
            y + bh
        )?;
    }

    for n in 0..params.nets {
        let hops = rng.gen_range(1..=params.max_segments_per_net.max(1));
        let mut prev = (
            rng.gen_range(0.0..w),
            rng.gen_range(0.0..h),
            rng.gen_range(0..layers),
        );
        for _ in 0..hops {
            let next = (
                rng.gen_range(0.0..w),
                rng.gen_range(0.0..h),
                rng.gen_range(0..layers),
            );
            writeln!(
                out,
                "SEG net{} {:.0} {:.0} M{} {:.0} {:.0} M{}",
                n,
                prev.0,
                prev.1,
                prev.2 + 1,
                next.0,
                next.1,
                next.2 + 1
            )?;
            prev = next;
        }
    }
    out.flush()
}
