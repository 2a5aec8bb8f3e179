//! Software rasterizer for headless contexts.
//!
//! Textures are sampled nearest-neighbour with the same texel rule as the
//! composite shader; a draw whose destination has the texture's own size is
//! an exact copy.

use crate::command::{DrawCommand, LoadAction, RenderPass};
use rayon::prelude::*;
use vcomp_core::{ImageBuffer, PixelRect};

pub(crate) fn execute(target: &mut ImageBuffer, passes: &[RenderPass]) {
    for pass in passes {
        if let LoadAction::Clear(color) = pass.load_action() {
            target.clear(color);
        }
        for draw in pass.draws() {
            draw_quad(target, draw);
        }
    }
}

fn draw_quad(target: &mut ImageBuffer, draw: &DrawCommand) {
    let texture = draw.texture();
    if texture.width() == 0 || texture.height() == 0 {
        return;
    }
    let dest = draw.dest();
    let bounds = PixelRect::full(target.width(), target.height());
    let Some(rect) = draw.clip_rect(bounds) else {
        return;
    };

    let blend = draw.pipeline().blend();
    let constant = draw.blend_constant();
    let (tex_w, tex_h) = (texture.width() as u64, texture.height() as u64);
    let row_bytes = target.width() as usize * target.format().bytes_per_pixel();
    let stride = target.stride().max(1);

    target
        .as_bytes_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .skip(rect.y as usize)
        .take(rect.height as usize)
        .for_each(|(y, row)| {
            let v = ((y as u64 - dest.y as u64) * tex_h / dest.height as u64) as u32;
            let src_row = texture.row_pixels(v);
            let pixels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(&mut row[..row_bytes]);
            for x in rect.x..rect.right() {
                let u = ((x as u64 - dest.x as u64) * tex_w / dest.width as u64) as usize;
                let dst = &mut pixels[x as usize];
                *dst = blend.apply(src_row[u], *dst, constant);
            }
        });
}
