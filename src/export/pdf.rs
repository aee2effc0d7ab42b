//! Minimal single-page PDF writer: one JPEG image scaled to fill the page.

use std::io::Write;

/// Page width in points (A4 portrait width).
pub const PAGE_WIDTH_PT: f64 = 595.0;

struct Writer {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl Writer {
    fn new() -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self { buf, offsets: Vec::new() }
    }

    fn object(&mut self, body: &str) -> std::io::Result<()> {
        self.offsets.push(self.buf.len());
        write!(self.buf, "{} 0 obj\n{}\nendobj\n", self.offsets.len(), body)
    }

    fn stream(&mut self, dict: &str, data: &[u8]) -> std::io::Result<()> {
        self.offsets.push(self.buf.len());
        write!(
            self.buf,
            "{} 0 obj\n<< {} /Length {} >>\nstream\n",
            self.offsets.len(),
            dict,
            data.len()
        )?;
        self.buf.extend_from_slice(data);
        self.buf.extend_from_slice(b"\nendstream\nendobj\n");
        Ok(())
    }

    fn finish(mut self) -> std::io::Result<Vec<u8>> {
        let xref = self.buf.len();
        write!(self.buf, "xref\n0 {}\n0000000000 65535 f \n", self.offsets.len() + 1)?;
        for offset in &self.offsets {
            write!(self.buf, "{:010} 00000 n \n", offset)?;
        }
        write!(
            self.buf,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            self.offsets.len() + 1,
            xref
        )?;
        Ok(self.buf)
    }
}

/// Page height that keeps the image aspect ratio at [`PAGE_WIDTH_PT`].
pub fn page_height(width: u32, height: u32) -> f64 {
    PAGE_WIDTH_PT * height as f64 / width.max(1) as f64
}

/// Wrap an encoded RGB JPEG as the only image on a single page.
pub fn single_page(jpeg: &[u8], width: u32, height: u32) -> std::io::Result<Vec<u8>> {
    let page_h = page_height(width, height);
    let content = format!("q {:.2} 0 0 {:.2} 0 0 cm /Im0 Do Q", PAGE_WIDTH_PT, page_h);

    let mut w = Writer::new();
    w.object("<< /Type /Catalog /Pages 2 0 R >>")?;
    w.object("<< /Type /Pages /Kids [3 0 R] /Count 1 >>")?;
    w.object(&format!(
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
         /Resources << /XObject << /Im0 4 0 R >> >> /Contents 5 0 R >>",
        PAGE_WIDTH_PT, page_h
    ))?;
    w.stream(
        &format!(
            "/Type /XObject /Subtype /Image /Width {} /Height {} \
             /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /DCTDecode",
            width, height
        ),
        jpeg,
    )?;
    w.stream("", content.as_bytes())?;
    w.finish()
}
