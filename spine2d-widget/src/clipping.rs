//! Runtime polygon clipping of attachment triangles against a clipping attachment.
//!
//! The clip polygon is triangulated and decomposed into convex parts once per clip region;
//! every triangle produced while the region is open is clipped against each part
//! (Sutherland-Hodgman) and re-fanned. Output buffers are owned by the tessellator and reused
//! from frame to frame.

use crate::{Color, Vertex};

#[derive(Default)]
pub(crate) struct Triangulator {
    indices: Vec<usize>,
    concave: Vec<bool>,
    triangles: Vec<u16>,
}

impl Triangulator {
    /// Ear-clipping triangulation of a simple polygon given as `x, y` pairs.
    pub(crate) fn triangulate(&mut self, polygon: &[f32]) -> &[u16] {
        self.triangles.clear();
        let mut count = polygon.len() / 2;
        if count < 3 {
            return &self.triangles;
        }

        self.indices.clear();
        self.indices.extend(0..count);
        self.concave.clear();
        for i in 0..count {
            let concave = is_concave_at(i, count, polygon, &self.indices);
            self.concave.push(concave);
        }

        while count > 3 {
            let ear = find_ear(polygon, &self.indices, &self.concave, count);
            let previous = (count + ear - 1) % count;
            let next = (ear + 1) % count;
            self.triangles.extend_from_slice(&[
                self.indices[previous] as u16,
                self.indices[ear] as u16,
                self.indices[next] as u16,
            ]);

            self.indices.remove(ear);
            self.concave.remove(ear);
            count -= 1;

            let previous = (count + ear - 1) % count;
            let next = if ear == count { 0 } else { ear };
            self.concave[previous] = is_concave_at(previous, count, polygon, &self.indices);
            self.concave[next] = is_concave_at(next, count, polygon, &self.indices);
        }

        if count == 3 {
            self.triangles.extend_from_slice(&[
                self.indices[2] as u16,
                self.indices[0] as u16,
                self.indices[1] as u16,
            ]);
        }

        &self.triangles
    }

    /// Merges a triangulation back into convex polygons.
    pub(crate) fn decompose(&self, polygon: &[f32], triangles: &[u16]) -> Vec<Vec<f32>> {
        let mut parts: Vec<ConvexPart> = Vec::new();
        let mut current = ConvexPart::default();
        let mut fan_base: Option<usize> = None;
        let mut last_winding = 0;

        for tri in triangles.chunks_exact(3) {
            let t1 = tri[0] as usize * 2;
            let t2 = tri[1] as usize * 2;
            let t3 = tri[2] as usize * 2;
            let (x1, y1) = (polygon[t1], polygon[t1 + 1]);
            let (x2, y2) = (polygon[t2], polygon[t2 + 1]);
            let (x3, y3) = (polygon[t3], polygon[t3 + 1]);

            // Extend the current fan while it stays convex.
            if fan_base == Some(t1) && current.vertices.len() >= 4 {
                let v = &current.vertices;
                let o = v.len() - 4;
                let winding1 = winding(v[o], v[o + 1], v[o + 2], v[o + 3], x3, y3);
                let winding2 = winding(x3, y3, v[0], v[1], v[2], v[3]);
                if winding1 == last_winding && winding2 == last_winding {
                    current.vertices.extend_from_slice(&[x3, y3]);
                    current.indices.push(t3);
                    continue;
                }
            }

            if !current.vertices.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            current.vertices.extend_from_slice(&[x1, y1, x2, y2, x3, y3]);
            current.indices.extend_from_slice(&[t1, t2, t3]);
            last_winding = winding(x1, y1, x2, y2, x3, y3);
            fan_base = Some(t1);
        }
        if !current.vertices.is_empty() {
            parts.push(current);
        }

        // Fold leftover single triangles into the fans they share an edge with.
        for i in 0..parts.len() {
            let (Some(&first_index), Some(&last_index)) =
                (parts[i].indices.first(), parts[i].indices.last())
            else {
                continue;
            };

            let v = &parts[i].vertices;
            let len = v.len();
            let (mut prev_prev_x, mut prev_prev_y) = (v[len - 4], v[len - 3]);
            let (mut prev_x, mut prev_y) = (v[len - 2], v[len - 1]);
            let (first_x, first_y) = (v[0], v[1]);
            let (second_x, second_y) = (v[2], v[3]);
            let winding0 = winding(prev_prev_x, prev_prev_y, prev_x, prev_y, first_x, first_y);

            let mut ii = 0;
            while ii < parts.len() {
                let other = &parts[ii];
                if ii == i
                    || other.indices.len() != 3
                    || other.indices[0] != first_index
                    || other.indices[1] != last_index
                {
                    ii += 1;
                    continue;
                }

                let other_len = other.vertices.len();
                let x3 = other.vertices[other_len - 2];
                let y3 = other.vertices[other_len - 1];
                let other_last_index = other.indices[2];

                let winding1 = winding(prev_prev_x, prev_prev_y, prev_x, prev_y, x3, y3);
                let winding2 = winding(x3, y3, first_x, first_y, second_x, second_y);
                if winding1 != winding0 || winding2 != winding0 {
                    ii += 1;
                    continue;
                }

                parts[ii].vertices.clear();
                parts[ii].indices.clear();
                parts[i].vertices.extend_from_slice(&[x3, y3]);
                parts[i].indices.push(other_last_index);
                prev_prev_x = prev_x;
                prev_prev_y = prev_y;
                prev_x = x3;
                prev_y = y3;
                ii = 0;
            }
        }

        parts
            .into_iter()
            .filter(|part| !part.vertices.is_empty())
            .map(|part| part.vertices)
            .collect()
    }
}

#[derive(Default)]
struct ConvexPart {
    vertices: Vec<f32>,
    indices: Vec<usize>,
}

fn find_ear(polygon: &[f32], indices: &[usize], concave: &[bool], count: usize) -> usize {
    let mut previous = count - 1;
    let mut i = 0usize;
    let mut next = 1usize;

    loop {
        if !concave[i] {
            let p1 = indices[previous] * 2;
            let p2 = indices[i] * 2;
            let p3 = indices[next] * 2;
            let (p1x, p1y) = (polygon[p1], polygon[p1 + 1]);
            let (p2x, p2y) = (polygon[p2], polygon[p2 + 1]);
            let (p3x, p3y) = (polygon[p3], polygon[p3 + 1]);

            let mut is_ear = true;
            let mut ii = (next + 1) % count;
            while ii != previous {
                if concave[ii] {
                    let v = indices[ii] * 2;
                    let (vx, vy) = (polygon[v], polygon[v + 1]);
                    if positive_area(p3x, p3y, p1x, p1y, vx, vy)
                        && positive_area(p1x, p1y, p2x, p2y, vx, vy)
                        && positive_area(p2x, p2y, p3x, p3y, vx, vy)
                    {
                        is_ear = false;
                        break;
                    }
                }
                ii = (ii + 1) % count;
            }
            if is_ear {
                return i;
            }
        }

        if next == 0 {
            // No ear found (degenerate input): cut at the last convex vertex.
            while i > 0 && concave[i] {
                i -= 1;
            }
            return i;
        }

        previous = i;
        i = next;
        next = (next + 1) % count;
    }
}

fn positive_area(p1x: f32, p1y: f32, p2x: f32, p2y: f32, p3x: f32, p3y: f32) -> bool {
    p1x * (p3y - p2y) + p2x * (p1y - p3y) + p3x * (p2y - p1y) >= 0.0
}

fn is_concave_at(index: usize, count: usize, polygon: &[f32], indices: &[usize]) -> bool {
    let previous = indices[(count + index - 1) % count] * 2;
    let current = indices[index] * 2;
    let next = indices[(index + 1) % count] * 2;
    !positive_area(
        polygon[previous],
        polygon[previous + 1],
        polygon[current],
        polygon[current + 1],
        polygon[next],
        polygon[next + 1],
    )
}

fn winding(p1x: f32, p1y: f32, p2x: f32, p2y: f32, p3x: f32, p3y: f32) -> i32 {
    let px = p2x - p1x;
    let py = p2y - p1y;
    if p3x * py - p3y * px + px * p1y - p1x * py >= 0.0 {
        1
    } else {
        -1
    }
}

fn make_clockwise(polygon: &mut [f32]) {
    let len = polygon.len();
    if len < 6 {
        return;
    }

    let mut area = polygon[len - 2] * polygon[1] - polygon[0] * polygon[len - 1];
    for i in (0..len - 3).step_by(2) {
        area += polygon[i] * polygon[i + 3] - polygon[i + 2] * polygon[i + 1];
    }
    if area < 0.0 {
        return;
    }

    let last_x = len - 2;
    for i in (0..len / 2).step_by(2) {
        let other = last_x - i;
        polygon.swap(i, other);
        polygon.swap(i + 1, other + 1);
    }
}

#[derive(Default)]
struct TriangleScratch {
    input: Vec<f32>,
    output: Vec<f32>,
    result: Vec<f32>,
}

impl TriangleScratch {
    /// Clips one triangle against a closed convex polygon (first point repeated at the end).
    /// Returns `false` when the triangle lies fully inside; otherwise `result` holds the clipped
    /// polygon, empty when nothing is left.
    #[allow(clippy::too_many_arguments)]
    fn clip(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        x3: f32,
        y3: f32,
        area: &[f32],
    ) -> bool {
        let mut input = std::mem::take(&mut self.input);
        let mut output = std::mem::take(&mut self.output);
        input.clear();
        input.extend_from_slice(&[x1, y1, x2, y2, x3, y3, x1, y1]);
        output.clear();
        self.result.clear();

        let mut clipped = false;
        let last_edge = area.len() - 4;
        let mut i = 0usize;
        loop {
            let edge_x = area[i];
            let edge_y = area[i + 1];
            let ex = edge_x - area[i + 2];
            let ey = edge_y - area[i + 3];

            for ii in (0..input.len() - 2).step_by(2) {
                let (in_x, in_y) = (input[ii], input[ii + 1]);
                let (in_x2, in_y2) = (input[ii + 2], input[ii + 3]);
                let side2 = ey * (edge_x - in_x2) > ex * (edge_y - in_y2);
                let side1 = ey * (edge_x - in_x) - ex * (edge_y - in_y);

                if side1 > 0.0 {
                    if side2 {
                        output.extend_from_slice(&[in_x2, in_y2]);
                        continue;
                    }
                    let ix = in_x2 - in_x;
                    let iy = in_y2 - in_y;
                    let t = side1 / (ix * ey - iy * ex);
                    if (0.0..=1.0).contains(&t) {
                        output.extend_from_slice(&[in_x + ix * t, in_y + iy * t]);
                    } else {
                        output.extend_from_slice(&[in_x2, in_y2]);
                    }
                } else if side2 {
                    let ix = in_x2 - in_x;
                    let iy = in_y2 - in_y;
                    let t = side1 / (ix * ey - iy * ex);
                    if (0.0..=1.0).contains(&t) {
                        output.extend_from_slice(&[in_x + ix * t, in_y + iy * t, in_x2, in_y2]);
                    } else {
                        output.extend_from_slice(&[in_x2, in_y2]);
                        continue;
                    }
                }
                clipped = true;
            }

            if output.is_empty() {
                self.input = input;
                self.output = output;
                return true;
            }
            output.extend_from_slice(&[output[0], output[1]]);

            if i == last_edge {
                break;
            }
            std::mem::swap(&mut input, &mut output);
            output.clear();
            i += 2;
        }

        self.result.extend_from_slice(&output[..output.len() - 2]);
        self.input = input;
        self.output = output;
        clipped
    }
}

/// Clips attachment triangles against the currently open clip region.
#[derive(Default)]
pub struct ClippingTessellator {
    triangulator: Triangulator,
    clip_slot: Option<usize>,
    end_slot: Option<usize>,
    clipping_polygon: Vec<f32>,
    clipping_polygons: Vec<Vec<f32>>,
    scratch: TriangleScratch,
    clipped_vertices: Vec<f32>,
    clipped_uvs: Vec<f32>,
    clipped_triangles: Vec<u16>,
    clipped_interleaved: Vec<Vertex>,
}

impl ClippingTessellator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a clip region for `clip_slot` using the clipping attachment's world vertices.
    /// Returns `false` when a region is already open or the polygon is degenerate.
    pub fn clip_start(&mut self, clip_slot: usize, polygon: &[f32], end_slot: Option<usize>) -> bool {
        if self.is_clipping() {
            return false;
        }
        if polygon.len() < 6 || polygon.len() % 2 != 0 {
            return false;
        }

        self.clipping_polygon.clear();
        self.clipping_polygon.extend_from_slice(polygon);
        make_clockwise(&mut self.clipping_polygon);

        let triangles = self.triangulator.triangulate(&self.clipping_polygon).to_vec();
        let mut polygons = self
            .triangulator
            .decompose(&self.clipping_polygon, &triangles);
        for part in &mut polygons {
            make_clockwise(part);
            part.push(part[0]);
            part.push(part[1]);
        }
        if polygons.is_empty() {
            return false;
        }

        self.clipping_polygons = polygons;
        self.clip_slot = Some(clip_slot);
        self.end_slot = end_slot;
        true
    }

    /// Closes the region when `slot` is the region's registered end slot.
    pub fn clip_end_with_slot(&mut self, slot: usize) {
        if self.is_clipping() && self.end_slot == Some(slot) {
            self.clip_end();
        }
    }

    pub fn clip_end(&mut self) {
        self.clip_slot = None;
        self.end_slot = None;
        self.clipping_polygons.clear();
        self.clipping_polygon.clear();
    }

    pub fn is_clipping(&self) -> bool {
        !self.clipping_polygons.is_empty()
    }

    /// Slot index of the clipping attachment that opened the current region.
    pub fn clip_slot(&self) -> Option<usize> {
        self.clip_slot
    }

    /// World vertices of the open clip region, clockwise.
    pub fn clipping_polygon(&self) -> &[f32] {
        &self.clipping_polygon
    }

    pub fn clipped_vertices(&self) -> &[f32] {
        &self.clipped_vertices
    }

    pub fn clipped_uvs(&self) -> &[f32] {
        &self.clipped_uvs
    }

    pub fn clipped_triangles(&self) -> &[u16] {
        &self.clipped_triangles
    }

    pub fn clipped_interleaved(&self) -> &[Vertex] {
        &self.clipped_interleaved
    }

    /// Sequential-buffers mode: positions and uvs (stride 2) in, separate position, uv and
    /// index buffers out.
    pub fn clip_triangles_unpacked(&mut self, vertices: &[f32], triangles: &[u16], uvs: &[f32]) {
        self.clipped_vertices.clear();
        self.clipped_uvs.clear();
        self.clipped_triangles.clear();
        if !self.is_clipping() {
            return;
        }

        let polygons = &self.clipping_polygons;
        let scratch = &mut self.scratch;
        let out_vertices = &mut self.clipped_vertices;
        let out_uvs = &mut self.clipped_uvs;
        let out_triangles = &mut self.clipped_triangles;
        let mut index: u16 = 0;

        'triangles: for tri in triangles.chunks_exact(3) {
            let (Some(p1), Some(p2), Some(p3)) = (
                read_vertex(vertices, uvs, tri[0]),
                read_vertex(vertices, uvs, tri[1]),
                read_vertex(vertices, uvs, tri[2]),
            ) else {
                continue;
            };
            let [x1, y1, u1, v1] = p1;
            let [x2, y2, u2, v2] = p2;
            let [x3, y3, u3, v3] = p3;

            for polygon in polygons {
                if !scratch.clip(x1, y1, x2, y2, x3, y3, polygon) {
                    out_vertices.extend_from_slice(&[x1, y1, x2, y2, x3, y3]);
                    out_uvs.extend_from_slice(&[u1, v1, u2, v2, u3, v3]);
                    out_triangles.extend_from_slice(&[index, index + 1, index + 2]);
                    index = index.wrapping_add(3);
                    continue 'triangles;
                }

                let result = &scratch.result;
                if result.is_empty() {
                    continue;
                }

                let d0 = y2 - y3;
                let d1 = x3 - x2;
                let d2 = x1 - x3;
                let d4 = y3 - y1;
                let d = 1.0 / (d0 * d2 + d1 * (y1 - y3));

                for xy in result.chunks_exact(2) {
                    let (x, y) = (xy[0], xy[1]);
                    let c0 = x - x3;
                    let c1 = y - y3;
                    let a = (d0 * c0 + d1 * c1) * d;
                    let b = (d4 * c0 + d2 * c1) * d;
                    let c = 1.0 - a - b;
                    out_vertices.extend_from_slice(&[x, y]);
                    out_uvs.extend_from_slice(&[u1 * a + u2 * b + u3 * c, v1 * a + v2 * b + v3 * c]);
                }

                let count = (result.len() / 2) as u16;
                for ii in 1..count.saturating_sub(1) {
                    out_triangles.extend_from_slice(&[index, index + ii, index + ii + 1]);
                }
                index = index.wrapping_add(count);
            }
        }
    }

    /// Interleaved mode: like [`Self::clip_triangles_unpacked`] but also emits
    /// [`Vertex`] records carrying the light and dark colors.
    pub fn clip_triangles(
        &mut self,
        vertices: &[f32],
        triangles: &[u16],
        uvs: &[f32],
        light: Color,
        dark: Color,
    ) {
        self.clip_triangles_unpacked(vertices, triangles, uvs);
        self.clipped_interleaved.clear();
        self.clipped_interleaved.extend(
            self.clipped_vertices
                .chunks_exact(2)
                .zip(self.clipped_uvs.chunks_exact(2))
                .map(|(xy, uv)| Vertex {
                    position: [xy[0], xy[1]],
                    uv: [uv[0], uv[1]],
                    color: light,
                    dark_color: dark,
                }),
        );
    }
}

fn read_vertex(vertices: &[f32], uvs: &[f32], vertex: u16) -> Option<[f32; 4]> {
    let offset = vertex as usize * 2;
    Some([
        *vertices.get(offset)?,
        *vertices.get(offset + 1)?,
        *uvs.get(offset)?,
        *uvs.get(offset + 1)?,
    ])
}

/// Clipped geometry kept on an attachment cache entry.
///
/// Buffers only grow. `update_from` reports whether the vertex count, index count or any
/// index value changed since the previous frame, so hosts can skip re-uploading stable
/// topology.
#[derive(Clone, Debug, Default)]
pub struct ClippedGeometry {
    vertices: Vec<f32>,
    uvs: Vec<f32>,
    indices: Vec<u16>,
    vertex_count: usize,
    index_count: usize,
}

impl ClippedGeometry {
    pub fn update_from(&mut self, clipper: &ClippingTessellator) -> bool {
        let src_vertices = clipper.clipped_vertices();
        let src_uvs = clipper.clipped_uvs();
        let src_indices = clipper.clipped_triangles();
        let vertex_count = src_vertices.len() / 2;
        let index_count = src_indices.len();

        let mut changed = vertex_count != self.vertex_count || index_count != self.index_count;
        if self.vertices.len() < vertex_count * 2 {
            self.vertices.resize(vertex_count * 2, 0.0);
            self.uvs.resize(vertex_count * 2, 0.0);
        }
        if self.indices.len() < index_count {
            self.indices.resize(index_count, 0);
        }

        self.vertices[..vertex_count * 2].copy_from_slice(&src_vertices[..vertex_count * 2]);
        self.uvs[..vertex_count * 2].copy_from_slice(&src_uvs[..vertex_count * 2]);
        for (dst, &src) in self.indices[..index_count].iter_mut().zip(src_indices) {
            if *dst != src {
                *dst = src;
                changed = true;
            }
        }

        self.vertex_count = vertex_count;
        self.index_count = index_count;
        changed
    }

    pub fn vertices(&self) -> &[f32] {
        &self.vertices[..self.vertex_count * 2]
    }

    pub fn uvs(&self) -> &[f32] {
        &self.uvs[..self.vertex_count * 2]
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices[..self.index_count]
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }

    /// Allocated vertex capacity, in vertices.
    pub fn vertex_capacity(&self) -> usize {
        self.vertices.len() / 2
    }
}
